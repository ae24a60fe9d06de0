use crate::error::{Result, TaskflowError};
use crate::id::TaskId;
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

// ---------------------------------------------------------------------------
// CheckDefinition
// ---------------------------------------------------------------------------

/// A single validation check: a labelled shell command.
///
/// Checks gate the `validating` → `committing` transition and run in the
/// order they appear in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckDefinition {
    pub label: String,
    pub command: String,
}

// ---------------------------------------------------------------------------
// CheckResult / ValidationOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub label: String,
    pub passed: bool,
    /// Exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, trimmed and capped. The full transcript
    /// is in the file at `log_path`.
    pub output: String,
    pub duration_ms: u64,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub failed_checks: Vec<String>,
    /// Every check's capped output under a `--- label ---` header, in run
    /// order. This is what log triage consumes after a failed run.
    pub all_output: String,
    pub results: Vec<CheckResult>,
}

// ---------------------------------------------------------------------------
// ValidationStatus (persisted)
// ---------------------------------------------------------------------------

/// The machine-readable record of the most recent validation run for a task,
/// written to `.taskflow/logs/{task}-validation-status.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    pub task_id: TaskId,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub failed_checks: Vec<String>,
}

/// Load the persisted status of the last validation run for `task_id`.
pub fn load_validation_status(root: &Path, task_id: TaskId) -> Result<ValidationStatus> {
    io::read_json(
        &paths::validation_status_path(root, task_id),
        "validation status",
    )
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run every configured check for `task_id`, in order, from the plan root.
///
/// A failing check is a normal result, not an error: all checks run to
/// completion so the status file names every failure, and each check's
/// combined output lands in its own log under `.taskflow/logs/`. The status
/// file is rewritten on every run, including a trivially-passing run with no
/// checks configured.
///
/// Errors are reserved for checks that cannot be run at all: an empty
/// command, or a shell that fails to spawn.
pub fn run_checks(
    root: &Path,
    task_id: TaskId,
    checks: &[CheckDefinition],
) -> Result<ValidationOutcome> {
    let mut results = Vec::with_capacity(checks.len());
    let mut failed_checks = Vec::new();
    let mut all_output = String::new();

    for check in checks {
        if check.command.trim().is_empty() {
            return Err(TaskflowError::UnrunnableCheck {
                label: check.label.clone(),
                reason: "command is empty".to_string(),
            });
        }

        let start = Instant::now();
        let capture = execute_check(&check.command, root).map_err(|reason| {
            TaskflowError::UnrunnableCheck {
                label: check.label.clone(),
                reason,
            }
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let log_path = paths::check_log_path(root, task_id, &check.label);
        io::atomic_write(&log_path, render_log(&check.command, &capture).as_bytes())?;

        let output = capped_output(&capture);
        all_output.push_str(&format!("--- {} ---\n{}\n", check.label, output));

        if !capture.success {
            failed_checks.push(check.label.clone());
        }
        results.push(CheckResult {
            label: check.label.clone(),
            passed: capture.success,
            exit_code: capture.exit_code,
            output,
            duration_ms,
            log_path,
        });
    }

    let passed = failed_checks.is_empty();
    let status = ValidationStatus {
        task_id,
        passed,
        timestamp: Utc::now(),
        failed_checks: failed_checks.clone(),
    };
    io::write_json(&paths::validation_status_path(root, task_id), &status)?;

    Ok(ValidationOutcome {
        passed,
        failed_checks,
        all_output,
        results,
    })
}

struct Capture {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Run one command through `sh -c` with the plan root as working directory.
///
/// stdout and stderr are drained on dedicated threads so a chatty check
/// cannot deadlock on a full pipe buffer. Checks are trusted project
/// commands and run without a timeout.
fn execute_check(command: &str, cwd: &Path) -> std::result::Result<Capture, String> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn: {e}"))?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || read_pipe(stdout_handle));
    let stderr_thread = std::thread::spawn(move || read_pipe(stderr_handle));

    let status = child.wait().map_err(|e| format!("wait failed: {e}"))?;
    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(Capture {
        success: status.success(),
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

/// Drain a pipe to the end. Bytes that are not valid UTF-8 decode lossily;
/// a check that prints raw bytes still has its surrounding text captured.
fn read_pipe<R: std::io::Read>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = handle {
        let _ = reader.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Merge stdout and stderr and cap to 10KB, keeping the tail. The ending of
/// a test or build run is where the verdict lives. The cut lands on a
/// character boundary, never inside a multi-byte sequence.
fn capped_output(capture: &Capture) -> String {
    let merged = if capture.stderr.is_empty() {
        capture.stdout.clone()
    } else if capture.stdout.is_empty() {
        capture.stderr.clone()
    } else {
        format!("{}\n{}", capture.stdout, capture.stderr)
    };
    const MAX_OUTPUT: usize = 10 * 1024;
    let trimmed = merged.trim();
    if trimmed.len() <= MAX_OUTPUT {
        return trimmed.to_string();
    }
    let mut cut = trimmed.len() - MAX_OUTPUT;
    while !trimmed.is_char_boundary(cut) {
        cut += 1;
    }
    trimmed[cut..].to_string()
}

fn render_log(command: &str, capture: &Capture) -> String {
    let mut log = format!("$ {command}\n");
    if !capture.stdout.is_empty() {
        log.push('\n');
        log.push_str(&capture.stdout);
        if !capture.stdout.ends_with('\n') {
            log.push('\n');
        }
    }
    if !capture.stderr.is_empty() {
        log.push_str("\n--- stderr ---\n");
        log.push_str(&capture.stderr);
        if !capture.stderr.ends_with('\n') {
            log.push('\n');
        }
    }
    match capture.exit_code {
        Some(code) => log.push_str(&format!("\nexit code: {code}\n")),
        None => log.push_str("\nterminated by signal\n"),
    }
    log
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
