use crate::error::TaskflowError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Feature ID `0` holds intermittent tasks, outside the normal priority
/// ordering.
pub const INTERMITTENT_FEATURE: u32 = 0;

// ---------------------------------------------------------------------------
// FeatureId
// ---------------------------------------------------------------------------

/// Feature identifier: a bare number, e.g. `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u32);

impl FeatureId {
    pub fn is_intermittent(self) -> bool {
        self.0 == INTERMITTENT_FEATURE
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FeatureId {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FeatureId(parse_component(s, s)?))
    }
}

// ---------------------------------------------------------------------------
// StoryId
// ---------------------------------------------------------------------------

/// Story identifier in `N.M` form, e.g. `1.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoryId {
    pub feature: u32,
    pub story: u32,
}

impl StoryId {
    pub fn new(feature: u32, story: u32) -> Self {
        StoryId { feature, story }
    }

    pub fn feature_id(self) -> FeatureId {
        FeatureId(self.feature)
    }

    pub fn is_intermittent(self) -> bool {
        self.feature == INTERMITTENT_FEATURE
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.feature, self.story)
    }
}

impl FromStr for StoryId {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [feature, story] = split_id::<2>(s)?;
        Ok(StoryId { feature, story })
    }
}

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

/// Task identifier in `N.M.K` form, e.g. `1.2.3`. Decomposes into the owning
/// feature (`1`) and story (`1.2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub feature: u32,
    pub story: u32,
    pub task: u32,
}

impl TaskId {
    pub fn new(feature: u32, story: u32, task: u32) -> Self {
        TaskId {
            feature,
            story,
            task,
        }
    }

    pub fn feature_id(self) -> FeatureId {
        FeatureId(self.feature)
    }

    pub fn story_id(self) -> StoryId {
        StoryId {
            feature: self.feature,
            story: self.story,
        }
    }

    pub fn is_intermittent(self) -> bool {
        self.feature == INTERMITTENT_FEATURE
    }

    /// Dotted form with dashes, used in log file names: `1.2.3` → `1-2-3`.
    pub fn dashed(self) -> String {
        format!("{}-{}-{}", self.feature, self.story, self.task)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.feature, self.story, self.task)
    }
}

impl FromStr for TaskId {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [feature, story, task] = split_id::<3>(s)?;
        Ok(TaskId {
            feature,
            story,
            task,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing and serde plumbing
// ---------------------------------------------------------------------------

fn split_id<const N: usize>(s: &str) -> Result<[u32; N], TaskflowError> {
    let mut out = [0u32; N];
    let mut parts = s.split('.');
    for slot in out.iter_mut() {
        let part = parts.next().ok_or_else(|| TaskflowError::InvalidId {
            value: s.to_string(),
            reason: format!("expected {N} dot-separated numbers"),
        })?;
        *slot = parse_component(s, part)?;
    }
    if parts.next().is_some() {
        return Err(TaskflowError::InvalidId {
            value: s.to_string(),
            reason: format!("expected {N} dot-separated numbers"),
        });
    }
    Ok(out)
}

fn parse_component(whole: &str, part: &str) -> Result<u32, TaskflowError> {
    // Strict digits only; `u32::from_str` would accept a leading '+'.
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TaskflowError::InvalidId {
            value: whole.to_string(),
            reason: "components must be decimal numbers".to_string(),
        });
    }
    part.parse().map_err(|_| TaskflowError::InvalidId {
        value: whole.to_string(),
        reason: "component out of range".to_string(),
    })
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(FeatureId);
string_serde!(StoryId);
string_serde!(TaskId);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_round_trips() {
        let id: TaskId = "1.2.3".parse().unwrap();
        assert_eq!(id, TaskId::new(1, 2, 3));
        assert_eq!(id.to_string(), "1.2.3");
        assert_eq!(id.story_id().to_string(), "1.2");
        assert_eq!(id.feature_id().to_string(), "1");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1..3", "+1.2.3", "1.2.-3"] {
            assert!(bad.parse::<TaskId>().is_err(), "expected invalid: {bad}");
        }
        assert!("1.2.3".parse::<StoryId>().is_err());
        assert!("x".parse::<FeatureId>().is_err());
    }

    #[test]
    fn ordering_is_numeric() {
        let a: TaskId = "2.1.1".parse().unwrap();
        let b: TaskId = "10.1.1".parse().unwrap();
        assert!(a < b);

        let s1: StoryId = "1.9".parse().unwrap();
        let s2: StoryId = "1.10".parse().unwrap();
        assert!(s1 < s2);
    }

    #[test]
    fn dashed_form_for_log_names() {
        let id: TaskId = "4.1.12".parse().unwrap();
        assert_eq!(id.dashed(), "4-1-12");
    }

    #[test]
    fn intermittent_bucket_is_feature_zero() {
        assert!("0.1.2".parse::<TaskId>().unwrap().is_intermittent());
        assert!(!"3.1.2".parse::<TaskId>().unwrap().is_intermittent());
        assert!(FeatureId(0).is_intermittent());
    }

    #[test]
    fn serde_uses_dotted_strings() {
        let id: TaskId = "1.2.3".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<TaskId>("\"1.2\"").is_err());
    }
}
