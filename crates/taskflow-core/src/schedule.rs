use crate::deps;
use crate::error::{Result, TaskflowError};
use crate::feature::{Feature, Story, TaskRef};
use crate::id::TaskId;
use crate::status::{RollupStatus, TaskStatus};
use crate::store::TasksProgress;

// ---------------------------------------------------------------------------
// Active task lookup
// ---------------------------------------------------------------------------

/// Find the task currently being worked on: the first task in scan order
/// (features by ID, then stories, then tasks) whose status is active.
///
/// A well-formed plan has at most one active task. If more than one is
/// found the first wins and the rest are logged, so a hand-edited plan
/// degrades to a predictable choice instead of an error.
pub fn find_active_task(tree: &TasksProgress) -> Option<&TaskRef> {
    let mut active = tree
        .iter_tasks()
        .filter(|(_, _, task)| task.status.is_active());
    let (_, _, first) = active.next()?;
    let extras: Vec<String> = active.map(|(_, _, task)| task.id.to_string()).collect();
    if !extras.is_empty() {
        tracing::warn!(
            active = %first.id,
            extras = ?extras,
            "multiple active tasks; using the first in scan order"
        );
    }
    Some(first)
}

/// Like [`find_active_task`] but an absent active task is an error.
pub fn require_active_task(tree: &TasksProgress) -> Result<&TaskRef> {
    find_active_task(tree).ok_or(TaskflowError::NoActiveTask)
}

// ---------------------------------------------------------------------------
// Next available task
// ---------------------------------------------------------------------------

/// Pick the next task to work on.
///
/// Candidates are considered in four tiers, each scanned in full plan order
/// before the next is tried:
///
/// 1. active tasks inside in-progress stories (resume what is underway);
/// 2. not-started tasks with all dependencies completed, inside in-progress
///    stories (finish the open story);
/// 3. not-started tasks with all dependencies completed, inside not-started
///    stories (open the next story);
/// 4. only when `include_intermittent` is set: any non-completed task in the
///    intermittent bucket (feature 0).
///
/// Intermittent tasks never surface in tiers 1-3. `exclude` drops a single
/// task from every tier, which lets a caller ask "what would come after this
/// one" without mutating the plan.
pub fn find_next_available_task(
    tree: &TasksProgress,
    exclude: Option<TaskId>,
    include_intermittent: bool,
) -> Option<&TaskRef> {
    let completed = deps::completed_ids(tree);
    let eligible = |task: &TaskRef| exclude != Some(task.id);

    if let Some(task) = first_match(tree, |_, story, task| {
        story.status == RollupStatus::InProgress
            && task.status.is_active()
            && !task.is_intermittent
            && eligible(task)
    }) {
        return Some(task);
    }

    if let Some(task) = first_match(tree, |_, story, task| {
        story.status == RollupStatus::InProgress
            && task.status == TaskStatus::NotStarted
            && !task.is_intermittent
            && deps::met_against(&completed, task)
            && eligible(task)
    }) {
        return Some(task);
    }

    if let Some(task) = first_match(tree, |_, story, task| {
        story.status == RollupStatus::NotStarted
            && task.status == TaskStatus::NotStarted
            && !task.is_intermittent
            && deps::met_against(&completed, task)
            && eligible(task)
    }) {
        return Some(task);
    }

    if include_intermittent {
        if let Some(task) = first_match(tree, |feature, _, task| {
            feature.id.is_intermittent()
                && task.status != TaskStatus::Completed
                && eligible(task)
        }) {
            return Some(task);
        }
    }

    None
}

fn first_match<'a, P>(tree: &'a TasksProgress, pred: P) -> Option<&'a TaskRef>
where
    P: Fn(&Feature, &Story, &TaskRef) -> bool,
{
    tree.iter_tasks()
        .find(|&(feature, story, task)| pred(feature, story, task))
        .map(|(_, _, task)| task)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
