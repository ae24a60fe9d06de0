use crate::error::{Result, TaskflowError};
use crate::id::{FeatureId, StoryId, TaskId};
use crate::io;
use crate::paths;
use crate::status::{RollupStatus, TaskStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TaskRef
// ---------------------------------------------------------------------------

/// Lightweight task reference embedded in the story for traversal and
/// rollups. `status` always mirrors the task file; it is rewritten from the
/// task file on every mutation, never edited on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub is_intermittent: bool,
}

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub status: RollupStatus,
    #[serde(default)]
    pub tasks: Vec<TaskRef>,
}

impl Story {
    pub fn task(&self, id: TaskId) -> Option<&TaskRef> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskRef> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

/// One feature file: the middle storage layer, holding every story and task
/// reference for the feature. `path` is the directory segment under `tasks/`
/// (without the leading `F`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub title: String,
    pub status: RollupStatus,
    pub path: String,
    #[serde(default)]
    pub stories: Vec<Story>,
}

impl Feature {
    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn file_path(root: &Path, id: FeatureId, path_hint: Option<&str>) -> Result<PathBuf> {
        let dir = paths::resolve_feature_dir(root, id, path_hint)?;
        Ok(paths::feature_file(&dir, id))
    }

    pub fn load(root: &Path, id: FeatureId, path_hint: Option<&str>) -> Result<Self> {
        let path = Self::file_path(root, id, path_hint)?;
        let feature: Feature = io::read_json(&path, &format!("feature {id}"))?;
        feature.validate(&path, id)?;
        Ok(feature)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::file_path(root, self.id, Some(&self.path))?;
        io::write_json(&path, self)
    }

    /// Structural checks beyond what serde enforces: the file must describe
    /// the feature it was resolved for, and every embedded ID must belong to
    /// its parent.
    fn validate(&self, path: &Path, expected: FeatureId) -> Result<()> {
        let malformed = |detail: String| TaskflowError::MalformedData {
            path: path.to_path_buf(),
            detail,
        };
        if self.id != expected {
            return Err(malformed(format!(
                "feature file claims id {} but was resolved for {expected}",
                self.id
            )));
        }
        for story in &self.stories {
            if story.id.feature_id() != self.id {
                return Err(malformed(format!(
                    "story {} does not belong to feature {}",
                    story.id, self.id
                )));
            }
            for task in &story.tasks {
                if task.id.story_id() != story.id {
                    return Err(malformed(format!(
                        "task {} does not belong to story {}",
                        task.id, story.id
                    )));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn story(&self, id: StoryId) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn story_mut(&mut self, id: StoryId) -> Option<&mut Story> {
        self.stories.iter_mut().find(|s| s.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskRef> {
        self.story(id.story_id()).and_then(|s| s.task(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
