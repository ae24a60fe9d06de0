use crate::error::{Result, TaskflowError};
use crate::io;
use crate::paths;
use crate::validation::CheckDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BranchConfig
// ---------------------------------------------------------------------------

/// Branch naming for automated switching.
///
/// Branches are story-scoped. Templates should contain `{story_id}` and may
/// use `{slug}`, which expands to the slugified story title. Stories in the
/// intermittent bucket (feature 0) use `intermittent_template`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default = "default_base_branch")]
    pub base: String,
    #[serde(default = "default_story_template")]
    pub story_template: String,
    #[serde(default = "default_intermittent_template")]
    pub intermittent_template: String,
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_story_template() -> String {
    "feature/{story_id}-{slug}".to_string()
}

fn default_intermittent_template() -> String {
    "chore/{story_id}-{slug}".to_string()
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            base: default_base_branch(),
            story_template: default_story_template(),
            intermittent_template: default_intermittent_template(),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskflowConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskflowConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub branch: BranchConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<CheckDefinition>,
}

fn default_version() -> u32 {
    1
}

impl Default for TaskflowConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            project: None,
            branch: BranchConfig::default(),
            validation: Vec::new(),
        }
    }
}

impl TaskflowConfig {
    /// Load `.taskflow/config.yaml`, falling back to defaults when the file
    /// does not exist. A present-but-unparsable file is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&data).map_err(|e| TaskflowError::MalformedData {
            path,
            detail: e.to_string(),
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&path, data.as_bytes())
    }

    pub fn checks(&self) -> &[CheckDefinition] {
        &self.validation
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.branch.base.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "branch.base is empty".to_string(),
            });
        }

        // Without the ID placeholder every story would resolve to the same
        // branch name.
        for (key, template) in [
            ("branch.story_template", &self.branch.story_template),
            (
                "branch.intermittent_template",
                &self.branch.intermittent_template,
            ),
        ] {
            if !template.contains("{story_id}") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{key} '{template}' does not contain {{story_id}}"),
                });
            }
        }

        let mut seen = HashSet::new();
        for check in &self.validation {
            if check.command.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("validation check '{}' has an empty command", check.label),
                });
            }
            if !seen.insert(check.label.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "duplicate validation check label '{}'; its log file will be overwritten",
                        check.label
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = TaskflowConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: TaskflowConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.branch.base, "main");
        assert_eq!(parsed.branch.story_template, "feature/{story_id}-{slug}");
        assert_eq!(parsed.branch.intermittent_template, "chore/{story_id}-{slug}");
        assert!(parsed.validation.is_empty());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = TaskflowConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.branch.base, "main");
        assert!(cfg.checks().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = TaskflowConfig::default();
        cfg.project = Some("demo".to_string());
        cfg.validation.push(CheckDefinition {
            label: "test".to_string(),
            command: "cargo test".to_string(),
        });
        cfg.save(dir.path()).unwrap();

        let loaded = TaskflowConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.project.as_deref(), Some("demo"));
        assert_eq!(loaded.checks().len(), 1);
        assert_eq!(loaded.checks()[0].command, "cargo test");
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "version: 1\nbranch:\n  base: develop\n";
        let cfg: TaskflowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.branch.base, "develop");
        assert_eq!(cfg.branch.story_template, "feature/{story_id}-{slug}");
        assert!(cfg.validation.is_empty());
    }

    #[test]
    fn checks_parse_in_declared_order() {
        let yaml = r#"
version: 1
validation:
  - label: lint
    command: cargo clippy
  - label: test
    command: cargo test
"#;
        let cfg: TaskflowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.checks().len(), 2);
        assert_eq!(cfg.checks()[0].label, "lint");
        assert_eq!(cfg.checks()[1].label, "test");
    }

    #[test]
    fn check_definition_rejects_unknown_fields() {
        let yaml = "label: lint\ncommand: cargo clippy\ncomand: typo\n";
        assert!(serde_yaml::from_str::<CheckDefinition>(yaml).is_err());
    }

    #[test]
    fn project_not_serialized_when_absent() {
        let cfg = TaskflowConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(!yaml.contains("project"));
    }

    #[test]
    fn validate_default_config_is_clean() {
        assert!(TaskflowConfig::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_empty_check_command() {
        let mut cfg = TaskflowConfig::default();
        cfg.validation.push(CheckDefinition {
            label: "bad".to_string(),
            command: "  ".to_string(),
        });
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("empty command")));
    }

    #[test]
    fn validate_flags_duplicate_labels() {
        let mut cfg = TaskflowConfig::default();
        for _ in 0..2 {
            cfg.validation.push(CheckDefinition {
                label: "test".to_string(),
                command: "cargo test".to_string(),
            });
        }
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("duplicate validation check label 'test'")));
    }

    #[test]
    fn validate_flags_template_without_placeholder() {
        let mut cfg = TaskflowConfig::default();
        cfg.branch.story_template = "story/fixed".to_string();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("{story_id}")));
    }

    #[test]
    fn validate_flags_empty_base() {
        let mut cfg = TaskflowConfig::default();
        cfg.branch.base = "".to_string();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("branch.base")));
    }

    #[test]
    fn garbage_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, ": not yaml : [").unwrap();
        let err = TaskflowConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, TaskflowError::MalformedData { .. }));
    }
}
