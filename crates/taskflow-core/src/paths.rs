use crate::error::{Result, TaskflowError};
use crate::id::{FeatureId, StoryId, TaskId};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const TASKS_DIR: &str = "tasks";
pub const TASKFLOW_DIR: &str = ".taskflow";
pub const LOGS_DIR: &str = ".taskflow/logs";
pub const CONFIG_FILE: &str = ".taskflow/config.yaml";
pub const PROJECT_INDEX_FILE: &str = "tasks/project-index.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn tasks_dir(root: &Path) -> PathBuf {
    root.join(TASKS_DIR)
}

pub fn project_index_path(root: &Path) -> PathBuf {
    root.join(PROJECT_INDEX_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join(LOGS_DIR)
}

/// Log file for one validation check: `.taskflow/logs/1-2-3-lint.log`.
/// The label is sanitized so arbitrary config labels stay valid file names.
pub fn check_log_path(root: &Path, id: TaskId, label: &str) -> PathBuf {
    let safe = label_re().replace_all(label, "-");
    logs_dir(root).join(format!("{}-{}.log", id.dashed(), safe))
}

/// Last validation outcome: `.taskflow/logs/1.2.3-validation-status.json`.
pub fn validation_status_path(root: &Path, id: TaskId) -> PathBuf {
    logs_dir(root).join(format!("{id}-validation-status.json"))
}

/// Feature directory from its index `path` segment: `tasks/F{segment}`.
pub fn feature_dir(root: &Path, path_segment: &str) -> PathBuf {
    tasks_dir(root).join(format!("F{path_segment}"))
}

/// Feature file inside its directory: `F{id}.json`.
pub fn feature_file(dir: &Path, id: FeatureId) -> PathBuf {
    dir.join(format!("F{id}.json"))
}

// ---------------------------------------------------------------------------
// Prefix resolution
//
// Directory and file names carry human-readable slugs after the ID, so every
// lookup first tries the recorded path and then falls back to a prefix scan.
// ---------------------------------------------------------------------------

/// Locate a feature's directory: the index `path` hint if it exists, else a
/// scan of `tasks/` for `F{id}` or `F{id}-*`.
pub fn resolve_feature_dir(root: &Path, id: FeatureId, path_hint: Option<&str>) -> Result<PathBuf> {
    if let Some(hint) = path_hint {
        let dir = feature_dir(root, hint);
        if dir.is_dir() {
            return Ok(dir);
        }
    }
    let tasks = tasks_dir(root);
    if !tasks.is_dir() {
        return Err(TaskflowError::NotFound {
            what: "tasks directory".to_string(),
            path: tasks,
        });
    }
    let exact = format!("F{id}");
    let prefixed = format!("F{id}-");
    scan_dir(&tasks, |name, is_dir| {
        is_dir && (name == exact || name.starts_with(&prefixed))
    })
    .ok_or_else(|| TaskflowError::NotFound {
        what: format!("feature {id} directory"),
        path: tasks,
    })
}

/// Locate a story's directory inside its feature: `S{id}-*`.
pub fn resolve_story_dir(feature_dir: &Path, id: StoryId) -> Result<PathBuf> {
    let exact = format!("S{id}");
    let prefixed = format!("S{id}-");
    scan_dir(feature_dir, |name, is_dir| {
        is_dir && (name == exact || name.starts_with(&prefixed))
    })
    .ok_or_else(|| TaskflowError::NotFound {
        what: format!("story {id} directory"),
        path: feature_dir.to_path_buf(),
    })
}

/// Locate a task's file inside its story directory: `T{id}-*.json` or exactly
/// `T{id}.json`. The separator is required so `T1.1.1` never matches
/// `T1.1.10-*.json`.
pub fn resolve_task_file(story_dir: &Path, id: TaskId) -> Result<PathBuf> {
    let exact = format!("T{id}.json");
    let prefixed = format!("T{id}-");
    let found = scan_dir(story_dir, |name, is_dir| {
        !is_dir && (name == exact || (name.starts_with(&prefixed) && name.ends_with(".json")))
    });
    found.ok_or_else(|| TaskflowError::NotFound {
        what: format!("task {id} file"),
        path: story_dir.to_path_buf(),
    })
}

/// First matching entry in `dir` by sorted name, for deterministic resolution
/// when more than one candidate exists.
fn scan_dir(dir: &Path, matches: impl Fn(&str, bool) -> bool) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let is_dir = e.file_type().ok()?.is_dir();
            let name = e.file_name().into_string().ok()?;
            matches(&name, is_dir).then_some(name)
        })
        .collect();
    names.sort();
    names.first().map(|n| dir.join(n))
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static LABEL_RE: OnceLock<Regex> = OnceLock::new();

fn label_re() -> &'static Regex {
    LABEL_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap())
}

/// Lowercase slug from a title: `"User Login!"` → `"user-login"`.
pub fn slugify(title: &str) -> String {
    let words: Vec<&str> = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect();
    if words.is_empty() {
        "untitled".to_string()
    } else {
        words.join("-").to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
