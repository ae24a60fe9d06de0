use crate::config::TaskflowConfig;
use crate::deps;
use crate::error::{Result, TaskflowError};
use crate::id::TaskId;
use crate::paths;
use crate::status::TaskStatus;
use crate::store;
use crate::task::TaskFile;
use crate::validation;
use std::path::Path;

// ---------------------------------------------------------------------------
// Lifecycle operations
// ---------------------------------------------------------------------------
//
// Every operation here rewrites the task file through
// `store::apply_task_mutation`, so the denormalized layers are refreshed on
// each transition. The task file's own status is what gets checked, not the
// reference in the feature file.

/// Move a `not-started` task into `setup`.
///
/// Refuses to start a task whose dependencies are not all completed; the
/// error names the unmet IDs.
pub fn start(root: &Path, id: TaskId) -> Result<TaskFile> {
    let tree = store::load_tasks_progress(root)?;
    let task_ref = tree.find_task(id).ok_or_else(|| TaskflowError::NotFound {
        what: format!("task {id}"),
        path: paths::tasks_dir(root),
    })?;

    let unmet = deps::unmet_dependencies(&tree, task_ref);
    if !unmet.is_empty() {
        let list = unmet
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(TaskflowError::InvalidTransition {
            from: TaskStatus::NotStarted.to_string(),
            to: TaskStatus::Setup.to_string(),
            reason: format!("dependencies not completed: {list}"),
        });
    }

    store::apply_task_mutation(root, id, |task| {
        if task.status != TaskStatus::NotStarted {
            return Err(TaskflowError::InvalidTransition {
                from: task.status.to_string(),
                to: TaskStatus::Setup.to_string(),
                reason: "only a not-started task can be started".to_string(),
            });
        }
        task.status = TaskStatus::Setup;
        Ok(())
    })
}

/// Advance a task one step along the happy path.
///
/// The `validating` → `committing` edge is gated: all configured checks run
/// first, and on failure the task stays in `validating` and the failure is
/// returned as [`TaskflowError::ValidationFailed`]. Advancing a task that is
/// not active is an error, including one that is already completed.
pub fn advance(root: &Path, config: &TaskflowConfig, id: TaskId) -> Result<TaskFile> {
    let current = TaskFile::load(root, id)?;
    let Some(target) = current.status.advance_target() else {
        let reason = if current.status == TaskStatus::Completed {
            "task is already completed".to_string()
        } else {
            "task is not active; start or resume it first".to_string()
        };
        return Err(TaskflowError::InvalidTransition {
            from: current.status.to_string(),
            to: "advance".to_string(),
            reason,
        });
    };

    if current.status == TaskStatus::Validating {
        let outcome = validation::run_checks(root, id, config.checks())?;
        if !outcome.passed {
            return Err(TaskflowError::ValidationFailed {
                task_id: id.to_string(),
                failed: outcome.failed_checks,
                log_dir: paths::logs_dir(root),
            });
        }
    }

    store::apply_task_mutation(root, id, |task| {
        task.status = target;
        Ok(())
    })
}

/// Block an active task, recording why and where it came from so `resume`
/// can put it back.
pub fn block(root: &Path, id: TaskId, reason: &str) -> Result<TaskFile> {
    store::apply_task_mutation(root, id, |task| {
        if !task.status.is_active() {
            return Err(TaskflowError::InvalidTransition {
                from: task.status.to_string(),
                to: TaskStatus::Blocked.to_string(),
                reason: "only an active task can be blocked".to_string(),
            });
        }
        task.previous_status = Some(task.status);
        task.status = TaskStatus::Blocked;
        task.blocked_reason = Some(reason.to_string());
        Ok(())
    })
}

/// Put an active task on hold. Unlike [`block`] no reason is recorded;
/// on-hold marks a deliberate pause rather than an impediment.
pub fn hold(root: &Path, id: TaskId) -> Result<TaskFile> {
    store::apply_task_mutation(root, id, |task| {
        if !task.status.is_active() {
            return Err(TaskflowError::InvalidTransition {
                from: task.status.to_string(),
                to: TaskStatus::OnHold.to_string(),
                reason: "only an active task can be put on hold".to_string(),
            });
        }
        task.previous_status = Some(task.status);
        task.status = TaskStatus::OnHold;
        Ok(())
    })
}

/// Bring a `blocked` or `on-hold` task back into work.
///
/// With no explicit target the task returns to its recorded previous status,
/// falling back to `setup` when that is absent or unusable. An explicit
/// target must be one of `setup`, `implementing`, `verifying` or
/// `validating`; the later pipeline states cannot be jumped into directly.
///
/// `blockedReason` and `previousStatus` are left in place as an audit trail.
pub fn resume(root: &Path, id: TaskId, target: Option<TaskStatus>) -> Result<TaskFile> {
    store::apply_task_mutation(root, id, |task| {
        if !matches!(task.status, TaskStatus::Blocked | TaskStatus::OnHold) {
            return Err(TaskflowError::InvalidTransition {
                from: task.status.to_string(),
                to: match target {
                    Some(t) => t.to_string(),
                    None => "resume".to_string(),
                },
                reason: "only a blocked or on-hold task can resume".to_string(),
            });
        }
        let dest = match target {
            Some(t) => {
                if !t.is_resume_target() {
                    return Err(TaskflowError::InvalidTransition {
                        from: task.status.to_string(),
                        to: t.to_string(),
                        reason: "resume target must be setup, implementing, verifying or validating"
                            .to_string(),
                    });
                }
                t
            }
            None => task
                .previous_status
                .filter(|s| s.is_active())
                .unwrap_or(TaskStatus::Setup),
        };
        task.status = dest;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Story, TaskRef};
    use crate::id::{FeatureId, StoryId};
    use crate::index::{FeatureSummary, ProjectIndex};
    use crate::io;
    use crate::status::RollupStatus;
    use crate::validation::CheckDefinition;
    use tempfile::TempDir;

    fn tid(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    /// One feature, one story, two tasks; 1.1.2 depends on 1.1.1.
    fn scaffold(root: &Path) {
        let index = ProjectIndex {
            project: "demo".to_string(),
            features: vec![FeatureSummary {
                id: FeatureId(1),
                title: "Auth".to_string(),
                status: RollupStatus::NotStarted,
                path: "1-auth".to_string(),
            }],
        };
        index.save(root).unwrap();

        let feature = Feature {
            id: FeatureId(1),
            title: "Auth".to_string(),
            status: RollupStatus::NotStarted,
            path: "1-auth".to_string(),
            stories: vec![Story {
                id: StoryId::new(1, 1),
                title: "Login".to_string(),
                status: RollupStatus::NotStarted,
                tasks: vec![
                    TaskRef {
                        id: tid("1.1.1"),
                        title: "Sessions".to_string(),
                        status: TaskStatus::NotStarted,
                        dependencies: vec![],
                        is_intermittent: false,
                    },
                    TaskRef {
                        id: tid("1.1.2"),
                        title: "Login form".to_string(),
                        status: TaskStatus::NotStarted,
                        dependencies: vec![tid("1.1.1")],
                        is_intermittent: false,
                    },
                ],
            }],
        };
        let fdir = root.join("tasks/F1-auth");
        let sdir = fdir.join("S1.1-login");
        std::fs::create_dir_all(&sdir).unwrap();
        io::write_json(&fdir.join("F1.json"), &feature).unwrap();

        for (id, title) in [("1.1.1", "Sessions"), ("1.1.2", "Login form")] {
            let task = TaskFile::new(tid(id), title, "", "backend");
            io::write_json(&sdir.join(format!("T{id}-work.json")), &task).unwrap();
        }
    }

    fn config_with(checks: &[(&str, &str)]) -> TaskflowConfig {
        let mut cfg = TaskflowConfig::default();
        for (label, command) in checks {
            cfg.validation.push(CheckDefinition {
                label: label.to_string(),
                command: command.to_string(),
            });
        }
        cfg
    }

    fn status_of(root: &Path, id: &str) -> TaskStatus {
        TaskFile::load(root, tid(id)).unwrap().status
    }

    #[test]
    fn start_moves_to_setup_and_rolls_up() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        let task = start(dir.path(), tid("1.1.1")).unwrap();
        assert_eq!(task.status, TaskStatus::Setup);

        let tree = store::load_tasks_progress(dir.path()).unwrap();
        assert_eq!(
            tree.find_story("1.1".parse().unwrap()).unwrap().status,
            RollupStatus::InProgress
        );
    }

    #[test]
    fn start_refuses_unmet_dependencies() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        let err = start(dir.path(), tid("1.1.2")).unwrap_err();
        match err {
            TaskflowError::InvalidTransition { reason, .. } => {
                assert!(reason.contains("1.1.1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn start_twice_is_rejected() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        start(dir.path(), tid("1.1.1")).unwrap();
        assert!(matches!(
            start(dir.path(), tid("1.1.1")),
            Err(TaskflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn advance_walks_the_happy_path() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        start(dir.path(), tid("1.1.1")).unwrap();
        let expected = [
            TaskStatus::Planning,
            TaskStatus::Implementing,
            TaskStatus::Verifying,
            TaskStatus::Validating,
            TaskStatus::Committing,
            TaskStatus::Completed,
        ];
        for want in expected {
            let task = advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
            assert_eq!(task.status, want);
        }

        let tree = store::load_tasks_progress(dir.path()).unwrap();
        assert_eq!(
            tree.find_task(tid("1.1.1")).unwrap().status,
            TaskStatus::Completed
        );
        // second task still pending, so the story stays in progress
        assert_eq!(
            tree.find_story("1.1".parse().unwrap()).unwrap().status,
            RollupStatus::InProgress
        );
    }

    #[test]
    fn advance_from_completed_is_an_error() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        start(dir.path(), tid("1.1.1")).unwrap();
        for _ in 0..6 {
            advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        }

        let err = advance(dir.path(), &cfg, tid("1.1.1")).unwrap_err();
        match err {
            TaskflowError::InvalidTransition { from, reason, .. } => {
                assert_eq!(from, "completed");
                assert!(reason.contains("already completed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn advance_from_not_started_is_an_error() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        assert!(matches!(
            advance(dir.path(), &config_with(&[]), tid("1.1.1")),
            Err(TaskflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn failing_checks_hold_the_task_in_validating() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[("gate", "false")]);

        start(dir.path(), tid("1.1.1")).unwrap();
        for _ in 0..4 {
            advance(dir.path(), &config_with(&[]), tid("1.1.1")).unwrap();
        }
        assert_eq!(status_of(dir.path(), "1.1.1"), TaskStatus::Validating);

        let err = advance(dir.path(), &cfg, tid("1.1.1")).unwrap_err();
        match err {
            TaskflowError::ValidationFailed { failed, .. } => {
                assert_eq!(failed, vec!["gate".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(status_of(dir.path(), "1.1.1"), TaskStatus::Validating);

        let status = validation::load_validation_status(dir.path(), tid("1.1.1")).unwrap();
        assert!(!status.passed);
    }

    #[test]
    fn passing_checks_unlock_committing() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        start(dir.path(), tid("1.1.1")).unwrap();
        for _ in 0..4 {
            advance(dir.path(), &config_with(&[]), tid("1.1.1")).unwrap();
        }

        let cfg = config_with(&[("gate", "true")]);
        let task = advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        assert_eq!(task.status, TaskStatus::Committing);
        assert!(validation::load_validation_status(dir.path(), tid("1.1.1"))
            .unwrap()
            .passed);
    }

    #[test]
    fn checks_only_gate_the_validating_edge() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        // A config whose checks always fail must not interfere with the
        // earlier transitions.
        let cfg = config_with(&[("gate", "false")]);

        start(dir.path(), tid("1.1.1")).unwrap();
        for want in [
            TaskStatus::Planning,
            TaskStatus::Implementing,
            TaskStatus::Verifying,
            TaskStatus::Validating,
        ] {
            let task = advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
            assert_eq!(task.status, want);
        }
    }

    #[test]
    fn block_records_reason_and_origin() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        start(dir.path(), tid("1.1.1")).unwrap();
        let task = block(dir.path(), tid("1.1.1"), "waiting on design").unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        assert_eq!(task.previous_status, Some(TaskStatus::Setup));
        assert_eq!(task.blocked_reason.as_deref(), Some("waiting on design"));

        let tree = store::load_tasks_progress(dir.path()).unwrap();
        assert_eq!(
            tree.find_story("1.1".parse().unwrap()).unwrap().status,
            RollupStatus::Blocked
        );
    }

    #[test]
    fn block_requires_an_active_task() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        assert!(matches!(
            block(dir.path(), tid("1.1.1"), "reason"),
            Err(TaskflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn resume_returns_to_previous_status() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        start(dir.path(), tid("1.1.1")).unwrap();
        advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        assert_eq!(status_of(dir.path(), "1.1.1"), TaskStatus::Implementing);

        block(dir.path(), tid("1.1.1"), "api outage").unwrap();
        let task = resume(dir.path(), tid("1.1.1"), None).unwrap();
        assert_eq!(task.status, TaskStatus::Implementing);
        // audit trail stays
        assert_eq!(task.blocked_reason.as_deref(), Some("api outage"));
        assert_eq!(task.previous_status, Some(TaskStatus::Implementing));
    }

    #[test]
    fn resume_without_history_falls_back_to_setup() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        // a task blocked by hand, with no previousStatus recorded
        store::apply_task_mutation(dir.path(), tid("1.1.1"), |task| {
            task.status = TaskStatus::Blocked;
            Ok(())
        })
        .unwrap();

        let task = resume(dir.path(), tid("1.1.1"), None).unwrap();
        assert_eq!(task.status, TaskStatus::Setup);
    }

    #[test]
    fn resume_accepts_an_allowed_explicit_target() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        start(dir.path(), tid("1.1.1")).unwrap();
        hold(dir.path(), tid("1.1.1")).unwrap();

        let task = resume(dir.path(), tid("1.1.1"), Some(TaskStatus::Verifying)).unwrap();
        assert_eq!(task.status, TaskStatus::Verifying);
    }

    #[test]
    fn resume_rejects_disallowed_targets() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());

        start(dir.path(), tid("1.1.1")).unwrap();
        block(dir.path(), tid("1.1.1"), "x").unwrap();

        for target in [
            TaskStatus::Planning,
            TaskStatus::Committing,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert!(matches!(
                resume(dir.path(), tid("1.1.1"), Some(target)),
                Err(TaskflowError::InvalidTransition { .. })
            ));
        }
        assert_eq!(status_of(dir.path(), "1.1.1"), TaskStatus::Blocked);
    }

    #[test]
    fn resume_requires_blocked_or_on_hold() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        start(dir.path(), tid("1.1.1")).unwrap();
        assert!(matches!(
            resume(dir.path(), tid("1.1.1"), None),
            Err(TaskflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn hold_then_resume_round_trip() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        start(dir.path(), tid("1.1.1")).unwrap();
        advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        let task = hold(dir.path(), tid("1.1.1")).unwrap();
        assert_eq!(task.status, TaskStatus::OnHold);
        assert!(task.blocked_reason.is_none());

        let task = resume(dir.path(), tid("1.1.1"), None).unwrap();
        assert_eq!(task.status, TaskStatus::Planning);
    }

    #[test]
    fn completing_both_tasks_completes_the_story() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        for id in ["1.1.1", "1.1.2"] {
            start(dir.path(), tid(id)).unwrap();
            for _ in 0..6 {
                advance(dir.path(), &cfg, tid(id)).unwrap();
            }
        }

        let tree = store::load_tasks_progress(dir.path()).unwrap();
        assert_eq!(
            tree.find_story("1.1".parse().unwrap()).unwrap().status,
            RollupStatus::Completed
        );
        assert_eq!(
            tree.find_feature(FeatureId(1)).unwrap().status,
            RollupStatus::Completed
        );
    }

    #[test]
    fn dependent_task_starts_once_dependency_completes() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let cfg = config_with(&[]);

        assert!(start(dir.path(), tid("1.1.2")).is_err());

        start(dir.path(), tid("1.1.1")).unwrap();
        for _ in 0..6 {
            advance(dir.path(), &cfg, tid("1.1.1")).unwrap();
        }

        let task = start(dir.path(), tid("1.1.2")).unwrap();
        assert_eq!(task.status, TaskStatus::Setup);
    }
}
