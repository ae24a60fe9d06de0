use crate::config::TaskflowConfig;
use crate::error::{Result, TaskflowError};
use crate::feature::Story;
use crate::paths;
use git2::{BranchType, ErrorCode, Repository};
use std::path::Path;
use std::process::Command;

/// Message used for stashes this module creates, so a user can recognise
/// them in `git stash list`.
pub const STASH_MESSAGE: &str = "taskflow auto-stash";

// ---------------------------------------------------------------------------
// BranchOutcome / StashDisposition
// ---------------------------------------------------------------------------

/// What happened to dirty working-tree changes during a branch switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashDisposition {
    /// The worktree was clean; nothing was stashed.
    Clean,
    /// Changes were stashed before the switch and popped back after it.
    Restored,
    /// Changes were stashed but the pop failed; they remain in the stash.
    LeftStashed,
}

/// Result of [`verify_branch`]. Partial failures that do not invalidate the
/// switch (a failed pull, a failed stash pop) surface here as values rather
/// than errors.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    /// The branch the repository is now on.
    pub branch: String,
    /// False when the repository was already on the expected branch.
    pub switched: bool,
    pub stash: StashDisposition,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Branch naming
// ---------------------------------------------------------------------------

/// The branch a story's work belongs on, from the configured templates.
///
/// Stories in the intermittent bucket use `intermittent_template`, all
/// others `story_template`. `{story_id}` expands to the dotted story ID and
/// `{slug}` to the slugified story title.
pub fn expected_branch(story: &Story, config: &TaskflowConfig) -> String {
    let template = if story.id.feature_id().is_intermittent() {
        &config.branch.intermittent_template
    } else {
        &config.branch.story_template
    };
    template
        .replace("{story_id}", &story.id.to_string())
        .replace("{slug}", &paths::slugify(&story.title))
}

// ---------------------------------------------------------------------------
// Branch verification and switching
// ---------------------------------------------------------------------------

/// Put the repository on the story's expected branch, carrying any dirty
/// working-tree changes across the switch.
///
/// The sequence:
/// 1. discover the repository (no repository ⇒
///    [`TaskflowError::VersionControlUnavailable`]);
/// 2. return early when already on the expected branch;
/// 3. stash dirty changes, untracked files included, under
///    [`STASH_MESSAGE`];
/// 4. check out the branch if it exists, otherwise create it from the
///    configured base after a `git pull` on the base; a pull failure
///    (offline work) downgrades to a warning;
/// 5. re-read HEAD and fail with [`TaskflowError::BranchMismatch`] if the
///    switch did not take, including the exact recovery command;
/// 6. pop the stash. A failed pop is reported as a warning naming
///    `git stash pop`; the branch switch is not rolled back, because the
///    changes are safe in the stash and the branch is correct.
///
/// The sequence is not transactional. A failure once step 3 has stashed is
/// never rolled back; instead the returned error names the stash and the
/// `git stash pop` that recovers the work.
pub fn verify_branch(
    repo_root: &Path,
    story: &Story,
    config: &TaskflowConfig,
) -> Result<BranchOutcome> {
    let expected = expected_branch(story, config);
    let repo = open_repo(repo_root)?;
    let mut warnings = Vec::new();

    if current_branch(&repo)?.as_deref() == Some(expected.as_str()) {
        return Ok(BranchOutcome {
            branch: expected,
            switched: false,
            stash: StashDisposition::Clean,
            warnings,
        });
    }

    let stashed = if has_uncommitted_changes(&repo)? {
        run_git(repo_root, &["stash", "push", "-u", "-m", STASH_MESSAGE])
            .map_err(|e| git_failed("stash push", &e))?;
        true
    } else {
        false
    };

    if let Err(e) = switch_to(repo_root, &repo, &expected, config, &mut warnings) {
        return Err(if stashed { stash_rescue(e) } else { e });
    }

    let stash = if stashed {
        match run_git(repo_root, &["stash", "pop"]) {
            Ok(_) => StashDisposition::Restored,
            Err(e) => {
                warnings.push(format!(
                    "stash pop failed: {e}; your changes are kept in the stash, \
                     resolve and run `git stash pop`"
                ));
                StashDisposition::LeftStashed
            }
        }
    } else {
        StashDisposition::Clean
    };

    Ok(BranchOutcome {
        branch: expected,
        switched: true,
        stash,
        warnings,
    })
}

/// Check out `expected`, creating it from the configured base when absent,
/// then confirm HEAD actually landed on it.
fn switch_to(
    repo_root: &Path,
    repo: &Repository,
    expected: &str,
    config: &TaskflowConfig,
    warnings: &mut Vec<String>,
) -> Result<()> {
    if branch_exists(repo, expected) {
        run_git(repo_root, &["checkout", expected]).map_err(|e| git_failed("checkout", &e))?;
    } else {
        run_git(repo_root, &["checkout", &config.branch.base])
            .map_err(|e| git_failed("checkout", &e))?;
        if let Err(e) = run_git(repo_root, &["pull"]) {
            warnings.push(format!(
                "could not pull '{}' before branching, continuing from the local tip: {e}",
                config.branch.base
            ));
        }
        run_git(repo_root, &["checkout", "-b", expected])
            .map_err(|e| git_failed("checkout -b", &e))?;
    }

    let actual = current_branch(repo)?.unwrap_or_else(|| "(detached HEAD)".to_string());
    if actual != expected {
        return Err(TaskflowError::BranchMismatch {
            expected: expected.to_string(),
            actual,
            recovery: format!("git checkout {expected}"),
        });
    }
    Ok(())
}

/// Extend a post-stash failure so its message names the stash and the exact
/// command that recovers the work.
fn stash_rescue(err: TaskflowError) -> TaskflowError {
    let hint = format!(
        "your changes are stashed under '{STASH_MESSAGE}'; \
         run `git stash pop` to recover them"
    );
    match err {
        TaskflowError::VersionControlUnavailable(msg) => {
            TaskflowError::VersionControlUnavailable(format!("{msg}; {hint}"))
        }
        TaskflowError::BranchMismatch {
            expected,
            actual,
            recovery,
        } => TaskflowError::BranchMismatch {
            expected,
            actual,
            recovery: format!("{recovery} && git stash pop"),
        },
        other => TaskflowError::VersionControlUnavailable(format!("{other}; {hint}")),
    }
}

// ---------------------------------------------------------------------------
// Repository plumbing
// ---------------------------------------------------------------------------
//
// Reads go through libgit2; mutations (stash, checkout, pull) shell out to
// `git`, whose behavior around hooks, config and stash edge cases is what
// users expect.

fn open_repo(root: &Path) -> Result<Repository> {
    let repo = Repository::discover(root).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            TaskflowError::VersionControlUnavailable(format!(
                "no git repository at {}",
                root.display()
            ))
        } else {
            TaskflowError::Git(e)
        }
    })?;
    if repo.is_bare() {
        return Err(TaskflowError::VersionControlUnavailable(
            "bare repositories have no working tree to switch".to_string(),
        ));
    }
    Ok(repo)
}

/// The checked-out branch's short name, or `None` for a detached or unborn
/// HEAD.
fn current_branch(repo: &Repository) -> Result<Option<String>> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn branch_exists(repo: &Repository, name: &str) -> bool {
    repo.find_branch(name, BranchType::Local).is_ok()
}

fn has_uncommitted_changes(repo: &Repository) -> Result<bool> {
    let statuses = repo.statuses(None)?;
    for entry in statuses.iter() {
        let status = entry.status();
        if !status.is_ignored() && !status.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run a git subcommand in `root`. `Err` carries trimmed stderr.
fn run_git(root: &Path, args: &[&str]) -> std::result::Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run git: {e}"))?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_failed(what: &str, detail: &str) -> TaskflowError {
    TaskflowError::VersionControlUnavailable(format!("git {what} failed: {detail}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
