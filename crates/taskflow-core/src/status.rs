use crate::feature::{Feature, Story};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a single task. The six states between `not-started`
/// and `completed` are the "active" states; `blocked` and `on-hold` are side
/// states reachable from any active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    Setup,
    Planning,
    Implementing,
    Verifying,
    Validating,
    Committing,
    Completed,
    Blocked,
    OnHold,
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::NotStarted,
            TaskStatus::Setup,
            TaskStatus::Planning,
            TaskStatus::Implementing,
            TaskStatus::Verifying,
            TaskStatus::Validating,
            TaskStatus::Committing,
            TaskStatus::Completed,
            TaskStatus::Blocked,
            TaskStatus::OnHold,
        ]
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskStatus::Setup
                | TaskStatus::Planning
                | TaskStatus::Implementing
                | TaskStatus::Verifying
                | TaskStatus::Validating
                | TaskStatus::Committing
        )
    }

    /// The single happy-path successor, defined only for active states.
    pub fn advance_target(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Setup => Some(TaskStatus::Planning),
            TaskStatus::Planning => Some(TaskStatus::Implementing),
            TaskStatus::Implementing => Some(TaskStatus::Verifying),
            TaskStatus::Verifying => Some(TaskStatus::Validating),
            TaskStatus::Validating => Some(TaskStatus::Committing),
            TaskStatus::Committing => Some(TaskStatus::Completed),
            TaskStatus::NotStarted
            | TaskStatus::Completed
            | TaskStatus::Blocked
            | TaskStatus::OnHold => None,
        }
    }

    /// States a blocked/on-hold task may be explicitly resumed into.
    pub fn is_resume_target(self) -> bool {
        matches!(
            self,
            TaskStatus::Setup
                | TaskStatus::Implementing
                | TaskStatus::Verifying
                | TaskStatus::Validating
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::Setup => "setup",
            TaskStatus::Planning => "planning",
            TaskStatus::Implementing => "implementing",
            TaskStatus::Verifying => "verifying",
            TaskStatus::Validating => "validating",
            TaskStatus::Committing => "committing",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::OnHold => "on-hold",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(TaskStatus::NotStarted),
            "setup" => Ok(TaskStatus::Setup),
            "planning" => Ok(TaskStatus::Planning),
            "implementing" => Ok(TaskStatus::Implementing),
            "verifying" => Ok(TaskStatus::Verifying),
            "validating" => Ok(TaskStatus::Validating),
            "committing" => Ok(TaskStatus::Committing),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "on-hold" => Ok(TaskStatus::OnHold),
            _ => Err(crate::error::TaskflowError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RollupStatus
// ---------------------------------------------------------------------------

/// Aggregate status of a story or feature, always derived from children and
/// never mutated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollupStatus {
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl RollupStatus {
    pub fn all() -> &'static [RollupStatus] {
        &[
            RollupStatus::NotStarted,
            RollupStatus::InProgress,
            RollupStatus::Completed,
            RollupStatus::Blocked,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RollupStatus::NotStarted => "not-started",
            RollupStatus::InProgress => "in-progress",
            RollupStatus::Completed => "completed",
            RollupStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for RollupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RollupStatus {
    type Err = crate::error::TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(RollupStatus::NotStarted),
            "in-progress" => Ok(RollupStatus::InProgress),
            "completed" => Ok(RollupStatus::Completed),
            "blocked" => Ok(RollupStatus::Blocked),
            _ => Err(crate::error::TaskflowError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Rollup calculation
// ---------------------------------------------------------------------------

/// How one child counts toward its parent's rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildClass {
    Completed,
    Active,
    Blocked,
    Dormant,
}

fn classify_task(status: TaskStatus) -> ChildClass {
    match status {
        TaskStatus::Completed => ChildClass::Completed,
        TaskStatus::Blocked => ChildClass::Blocked,
        s if s.is_active() => ChildClass::Active,
        // not-started and on-hold both count as dormant
        _ => ChildClass::Dormant,
    }
}

fn classify_rollup(status: RollupStatus) -> ChildClass {
    match status {
        RollupStatus::Completed => ChildClass::Completed,
        RollupStatus::Blocked => ChildClass::Blocked,
        RollupStatus::InProgress => ChildClass::Active,
        RollupStatus::NotStarted => ChildClass::Dormant,
    }
}

/// All completed → completed; any active or any completed → in-progress;
/// any blocked (with nothing completed or active) → blocked; else
/// not-started. An empty child list is not-started.
fn rollup(children: impl Iterator<Item = ChildClass>) -> RollupStatus {
    let mut seen_any = false;
    let mut all_completed = true;
    let mut any_completed = false;
    let mut any_active = false;
    let mut any_blocked = false;

    for class in children {
        seen_any = true;
        match class {
            ChildClass::Completed => any_completed = true,
            ChildClass::Active => {
                all_completed = false;
                any_active = true;
            }
            ChildClass::Blocked => {
                all_completed = false;
                any_blocked = true;
            }
            ChildClass::Dormant => all_completed = false,
        }
    }

    if !seen_any {
        return RollupStatus::NotStarted;
    }
    if all_completed {
        return RollupStatus::Completed;
    }
    if any_active || any_completed {
        return RollupStatus::InProgress;
    }
    if any_blocked {
        return RollupStatus::Blocked;
    }
    RollupStatus::NotStarted
}

/// Derive a story's status purely from its tasks' statuses.
pub fn story_status(story: &Story) -> RollupStatus {
    rollup(story.tasks.iter().map(|t| classify_task(t.status)))
}

/// Derive a feature's status by rolling up freshly computed story statuses,
/// ignoring whatever is stored on each story.
pub fn feature_status(feature: &Feature) -> RollupStatus {
    rollup(
        feature
            .stories
            .iter()
            .map(|s| classify_rollup(story_status(s))),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
