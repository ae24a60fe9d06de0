use crate::error::Result;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------
//
// The engine itself never generates text: the store, scheduler, lifecycle,
// and branch modules operate entirely on local state. These traits are the
// seams where outer layers (prompt assembly, log analysis) plug in, so a
// backend can be swapped without touching the engine.

/// Role of a message in a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Knobs for a single generation call. All fields are optional; `None`
/// leaves the backend's own default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    /// Model identifier understood by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedText {
    pub content: String,

    /// Token count reported by the backend, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// Backend that turns a message list into text.
///
/// Object-safe so callers can hold a `Box<dyn TextGenerator>` and select the
/// backend at runtime.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, messages: &[Message], options: &GenerateOptions) -> Result<GeneratedText>;
}

// ---------------------------------------------------------------------------
// Log triage
// ---------------------------------------------------------------------------

/// One problem extracted from raw check output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRecord {
    /// File the problem was reported against.
    pub file: String,

    /// Human-readable description.
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Tool-specific error code, such as a compiler diagnostic ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result of matching output against a library of known failure patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternScan {
    /// Patterns from the library that matched.
    pub known_errors: Vec<String>,

    /// True when the output contains failures no pattern accounts for.
    pub has_new_errors: bool,
}

/// Analyzer for the combined output of a failed validation pass.
///
/// Callers feed it [`ValidationOutcome::all_output`] after a gate failure;
/// the validation runner itself never calls it.
///
/// [`ValidationOutcome::all_output`]: crate::validation::ValidationOutcome
pub trait LogTriage: Send + Sync {
    /// Extract structured problem records from raw output.
    fn classify(&self, raw_output: &str) -> Vec<TriageRecord>;

    /// Sort failures into known patterns versus novel ones.
    fn match_known_patterns(&self, output: &str) -> PatternScan;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
