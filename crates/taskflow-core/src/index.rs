use crate::error::{Result, TaskflowError};
use crate::id::FeatureId;
use crate::io;
use crate::paths;
use crate::status::RollupStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Index entry for one feature: a denormalized projection of the feature
/// file, just enough to list features and locate their directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub id: FeatureId,
    pub title: String,
    pub status: RollupStatus,
    pub path: String,
}

/// `tasks/project-index.json`: the authoritative list of features and where
/// to find each one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIndex {
    pub project: String,
    #[serde(default)]
    pub features: Vec<FeatureSummary>,
}

impl ProjectIndex {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::project_index_path(root);
        let index: ProjectIndex = io::read_json(&path, "project index")?;

        let mut seen = HashSet::new();
        for entry in &index.features {
            if !seen.insert(entry.id) {
                return Err(TaskflowError::MalformedData {
                    path,
                    detail: format!("feature {} is listed more than once", entry.id),
                });
            }
        }
        Ok(index)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_json(&paths::project_index_path(root), self)
    }

    pub fn entry(&self, id: FeatureId) -> Option<&FeatureSummary> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn entry_mut(&mut self, id: FeatureId) -> Option<&mut FeatureSummary> {
        self.features.iter_mut().find(|f| f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> ProjectIndex {
        ProjectIndex {
            project: "demo".to_string(),
            features: vec![
                FeatureSummary {
                    id: FeatureId(1),
                    title: "Authentication".to_string(),
                    status: RollupStatus::NotStarted,
                    path: "1-authentication".to_string(),
                },
                FeatureSummary {
                    id: FeatureId(2),
                    title: "Billing".to_string(),
                    status: RollupStatus::NotStarted,
                    path: "2-billing".to_string(),
                },
            ],
        }
    }

    #[test]
    fn round_trips() {
        let dir = TempDir::new().unwrap();
        sample_index().save(dir.path()).unwrap();
        let loaded = ProjectIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.project, "demo");
        assert_eq!(loaded.features.len(), 2);
        assert_eq!(loaded.entry(FeatureId(2)).unwrap().title, "Billing");
    }

    #[test]
    fn missing_index_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ProjectIndex::load(dir.path()).unwrap_err();
        match err {
            TaskflowError::NotFound { what, .. } => assert_eq!(what, "project index"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_feature_ids_are_malformed() {
        let dir = TempDir::new().unwrap();
        let mut index = sample_index();
        index.features[1].id = FeatureId(1);
        index.save(dir.path()).unwrap();
        let err = ProjectIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, TaskflowError::MalformedData { .. }));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_string_pretty(&sample_index()).unwrap();
        assert!(json.contains("\"project\""));
        assert!(json.contains("\"features\""));
        assert!(json.contains("\"path\": \"1-authentication\""));
    }
}
