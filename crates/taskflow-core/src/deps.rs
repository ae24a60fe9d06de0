use crate::feature::TaskRef;
use crate::id::TaskId;
use crate::status::TaskStatus;
use crate::store::TasksProgress;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Dependency resolution
// ---------------------------------------------------------------------------
//
// A dependency is satisfied only by a `completed` task. IDs that do not
// resolve to any task in the tree count as unmet, not as errors: a typo in a
// dependency list blocks the dependent task instead of poisoning the whole
// plan.

/// Collect the IDs of every completed task in the tree.
pub fn completed_ids(tree: &TasksProgress) -> HashSet<TaskId> {
    tree.iter_tasks()
        .filter(|(_, _, task)| task.status == TaskStatus::Completed)
        .map(|(_, _, task)| task.id)
        .collect()
}

/// Check a task's dependencies against a precomputed completed-ID set.
///
/// The scheduler calls this once per candidate, so the set is built a single
/// time by the caller rather than rebuilt per task.
pub fn met_against(completed: &HashSet<TaskId>, task: &TaskRef) -> bool {
    task.dependencies.iter().all(|dep| completed.contains(dep))
}

/// True when every dependency of `task` is completed.
pub fn dependencies_met(tree: &TasksProgress, task: &TaskRef) -> bool {
    met_against(&completed_ids(tree), task)
}

/// The dependencies of `task` that are not yet completed, in declaration
/// order. Unresolved IDs are included.
pub fn unmet_dependencies(tree: &TasksProgress, task: &TaskRef) -> Vec<TaskId> {
    let completed = completed_ids(tree);
    task.dependencies
        .iter()
        .filter(|dep| !completed.contains(dep))
        .copied()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
