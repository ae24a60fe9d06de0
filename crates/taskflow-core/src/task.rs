use crate::error::{Result, TaskflowError};
use crate::id::TaskId;
use crate::io;
use crate::paths;
use crate::status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subtask
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtaskStatus {
    Pending,
    Completed,
}

/// Checklist item inside a task. Purely informational; never consulted by
/// scheduling or rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub description: String,
    pub status: SubtaskStatus,
}

// ---------------------------------------------------------------------------
// Notes and time entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub timestamp: DateTime<Utc>,
    pub minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// TaskFile
// ---------------------------------------------------------------------------

/// Full detail for one task, stored as its own file under the story
/// directory. Its `status` is the source of truth; the TaskRef inside the
/// feature file is rewritten from it on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFile {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub skill: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_entries: Vec<TimeEntry>,
}

impl TaskFile {
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        skill: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::NotStarted,
            skill: skill.into(),
            subtasks: Vec::new(),
            context: Vec::new(),
            blocked_reason: None,
            previous_status: None,
            notes: Vec::new(),
            time_entries: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Resolve the on-disk location of a task file by walking the layout:
    /// feature directory → story directory → `T{id}-*.json`.
    pub fn locate(root: &Path, id: TaskId) -> Result<PathBuf> {
        let feature_dir = paths::resolve_feature_dir(root, id.feature_id(), None)?;
        let story_dir = paths::resolve_story_dir(&feature_dir, id.story_id())?;
        paths::resolve_task_file(&story_dir, id)
    }

    pub fn load(root: &Path, id: TaskId) -> Result<Self> {
        let path = Self::locate(root, id)?;
        let task: TaskFile = io::read_json(&path, &format!("task {id}"))?;
        if task.id != id {
            return Err(TaskflowError::MalformedData {
                path,
                detail: format!("task file claims id {} but was resolved for {id}", task.id),
            });
        }
        Ok(task)
    }

    /// Overwrite the existing task file. Task files are created by external
    /// tooling, so a missing file is an error rather than a create.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::locate(root, self.id)?;
        io::write_json(&path, self)
    }

    // -----------------------------------------------------------------------
    // Detail mutations (status changes live in the lifecycle module)
    // -----------------------------------------------------------------------

    pub fn set_subtask_status(&mut self, subtask_id: &str, status: SubtaskStatus) -> Result<()> {
        let subtask = self
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| TaskflowError::InvalidId {
                value: subtask_id.to_string(),
                reason: format!("no such subtask in task {}", self.id),
            })?;
        subtask.status = status;
        Ok(())
    }

    pub fn add_note(&mut self, text: impl Into<String>) {
        self.notes.push(Note {
            timestamp: Utc::now(),
            text: text.into(),
        });
    }

    pub fn log_time(&mut self, minutes: u32, description: Option<String>) {
        self.time_entries.push(TimeEntry {
            timestamp: Utc::now(),
            minutes,
            description,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
