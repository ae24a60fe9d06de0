use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskflowError {
    #[error("{what} not found: {path}")]
    NotFound { what: String, path: PathBuf },

    #[error("malformed data in {path}: {detail}")]
    MalformedData { path: PathBuf, detail: String },

    #[error("invalid id '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("no active task")]
    NoActiveTask,

    #[error("version control unavailable: {0}")]
    VersionControlUnavailable(String),

    #[error("on branch '{actual}' but expected '{expected}'; run `{recovery}` to recover")]
    BranchMismatch {
        expected: String,
        actual: String,
        recovery: String,
    },

    #[error("validation failed for task {task_id}: {failed:?} (logs in {log_dir})")]
    ValidationFailed {
        task_id: String,
        failed: Vec<String>,
        log_dir: PathBuf,
    },

    #[error("check '{label}' is not runnable: {reason}")]
    UnrunnableCheck { label: String, reason: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TaskflowError>;
