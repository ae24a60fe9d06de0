use crate::error::{Result, TaskflowError};
use crate::feature::{Feature, Story, TaskRef};
use crate::id::{FeatureId, StoryId, TaskId};
use crate::index::ProjectIndex;
use crate::paths;
use crate::status::{feature_status, story_status, RollupStatus, TaskStatus};
use crate::task::{SubtaskStatus, TaskFile};
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// TasksProgress
// ---------------------------------------------------------------------------

/// The whole plan assembled in memory: project index plus every feature
/// file, ordered numerically by feature ID. Features whose files could not
/// be read are degraded to index stubs and reported in `warnings`.
#[derive(Debug, Clone)]
pub struct TasksProgress {
    pub project: String,
    pub features: Vec<Feature>,
    pub warnings: Vec<String>,
}

impl TasksProgress {
    pub fn find_feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn find_story(&self, id: StoryId) -> Option<&Story> {
        self.find_feature(id.feature_id()).and_then(|f| f.story(id))
    }

    pub fn find_task(&self, id: TaskId) -> Option<&TaskRef> {
        self.find_feature(id.feature_id()).and_then(|f| f.task(id))
    }

    /// Every task reference in feature → story → task order, with its
    /// ancestors. This is the scan order all search policies share.
    pub fn iter_tasks(&self) -> impl Iterator<Item = (&Feature, &Story, &TaskRef)> {
        self.features.iter().flat_map(|feature| {
            feature.stories.iter().flat_map(move |story| {
                story.tasks.iter().map(move |task| (feature, story, task))
            })
        })
    }

    /// Count progress at every level of the tree.
    pub fn summary(&self) -> ProgressSummary {
        let mut summary = ProgressSummary::default();
        for feature in &self.features {
            tally_rollup(&mut summary.features, feature.status);
            for story in &feature.stories {
                tally_rollup(&mut summary.stories, story.status);
                for task in &story.tasks {
                    summary.tasks.total += 1;
                    if task.status == TaskStatus::Completed {
                        summary.tasks.completed += 1;
                    } else if task.status.is_active() {
                        summary.tasks.active += 1;
                    } else if task.status == TaskStatus::Blocked {
                        summary.tasks.blocked += 1;
                    }
                }
            }
        }
        summary
    }

    /// Human-readable progress line: "3/9 tasks completed, 1 active, 2 blocked".
    pub fn summarize(&self) -> String {
        let tasks = self.summary().tasks;
        format!(
            "{}/{} tasks completed, {} active, {} blocked",
            tasks.completed, tasks.total, tasks.active, tasks.blocked
        )
    }
}

/// Counts for one level of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCounts {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub blocked: usize,
}

/// Plan-wide progress, one row of counts per tree level. The story and
/// feature rows count rollup statuses, so `active` there means in-progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub features: LevelCounts,
    pub stories: LevelCounts,
    pub tasks: LevelCounts,
}

fn tally_rollup(counts: &mut LevelCounts, status: RollupStatus) {
    counts.total += 1;
    match status {
        RollupStatus::Completed => counts.completed += 1,
        RollupStatus::InProgress => counts.active += 1,
        RollupStatus::Blocked => counts.blocked += 1,
        RollupStatus::NotStarted => {}
    }
}

// ---------------------------------------------------------------------------
// Composite load
// ---------------------------------------------------------------------------

/// Assemble the full tree. One unreadable feature file never aborts the
/// load: that feature becomes a stub carrying the index's title and status
/// with an empty story list, and a warning is surfaced.
pub fn load_tasks_progress(root: &Path) -> Result<TasksProgress> {
    let index = ProjectIndex::load(root)?;

    let mut entries = index.features.clone();
    entries.sort_by_key(|e| e.id);

    let mut features = Vec::with_capacity(entries.len());
    let mut warnings = Vec::new();
    for entry in &entries {
        match Feature::load(root, entry.id, Some(&entry.path)) {
            Ok(feature) => features.push(feature),
            Err(e) => {
                tracing::warn!(feature = %entry.id, error = %e, "feature file unreadable, degraded to index stub");
                warnings.push(format!("feature {}: {e}", entry.id));
                features.push(Feature {
                    id: entry.id,
                    title: entry.title.clone(),
                    status: entry.status,
                    path: entry.path.clone(),
                    stories: Vec::new(),
                });
            }
        }
    }

    Ok(TasksProgress {
        project: index.project,
        features,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Recompute-and-overwrite
// ---------------------------------------------------------------------------

/// Apply a mutation to one task file and rewrite everything derived from it:
/// the TaskRef inside the feature file, the story and feature rollups, and
/// the project index entry. Every mutation in this crate funnels through
/// here so the three storage layers can never drift apart silently.
pub fn apply_task_mutation<F>(root: &Path, id: TaskId, mutate: F) -> Result<TaskFile>
where
    F: FnOnce(&mut TaskFile) -> Result<()>,
{
    let mut task = TaskFile::load(root, id)?;
    mutate(&mut task)?;
    task.save(root)?;
    sync_from_task(root, &task)?;
    Ok(task)
}

/// Rewrite the denormalized layers from a freshly saved task file. The task
/// file has already been written; a crash here leaves only stale rollups,
/// which the next sync recomputes.
fn sync_from_task(root: &Path, task: &TaskFile) -> Result<()> {
    let mut index = ProjectIndex::load(root)?;
    let entry = index
        .entry(task.id.feature_id())
        .ok_or_else(|| TaskflowError::NotFound {
            what: format!("feature {} index entry", task.id.feature_id()),
            path: paths::project_index_path(root),
        })?;
    let path_hint = entry.path.clone();

    let mut feature = Feature::load(root, task.id.feature_id(), Some(&path_hint))?;
    let feature_path = Feature::file_path(root, feature.id, Some(&feature.path))?;

    let story = feature
        .story_mut(task.id.story_id())
        .ok_or_else(|| TaskflowError::NotFound {
            what: format!("story {}", task.id.story_id()),
            path: feature_path.clone(),
        })?;
    let task_ref = story
        .task_mut(task.id)
        .ok_or_else(|| TaskflowError::NotFound {
            what: format!("task reference {}", task.id),
            path: feature_path,
        })?;

    task_ref.status = task.status;
    task_ref.title = task.title.clone();
    story.status = story_status(story);
    feature.status = feature_status(&feature);
    feature.save(root)?;

    let title = feature.title.clone();
    let status = feature.status;
    if let Some(entry) = index.entry_mut(feature.id) {
        entry.status = status;
        entry.title = title;
    }
    index.save(root)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Persisted detail mutations
// ---------------------------------------------------------------------------

pub fn set_subtask_status(
    root: &Path,
    id: TaskId,
    subtask_id: &str,
    status: SubtaskStatus,
) -> Result<TaskFile> {
    apply_task_mutation(root, id, |task| task.set_subtask_status(subtask_id, status))
}

pub fn add_note(root: &Path, id: TaskId, text: &str) -> Result<TaskFile> {
    apply_task_mutation(root, id, |task| {
        task.add_note(text);
        Ok(())
    })
}

pub fn log_time(
    root: &Path,
    id: TaskId,
    minutes: u32,
    description: Option<String>,
) -> Result<TaskFile> {
    apply_task_mutation(root, id, |task| {
        task.log_time(minutes, description);
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
