//! Validation subsystem error types.
//!
//! `ValidationError` (in shared-types) is what a verdict carries; the types
//! here are the stage-local detail and the ingestion failures that never
//! reach a verdict.

use thiserror::Error;

/// Why a declared timestamp falls outside the freshness window.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FreshnessError {
    /// Absent, empty, or not an ISO-8601 / RFC 3339 instant.
    #[error("missing or invalid timestamp")]
    InvalidTimestamp,

    /// Older than the window allows.
    #[error("stale: age {age_secs:.1}s (max {max_age_secs}s)")]
    Stale { age_secs: f64, max_age_secs: f64 },

    /// Declared further in the future than the allowed clock skew.
    #[error("future-dated: {ahead_secs:.1}s ahead (max skew {max_skew_secs}s)")]
    FutureDated {
        ahead_secs: f64,
        max_skew_secs: f64,
    },
}

/// A payload that cannot become a `TelemetryMessage` at all.
///
/// No verdict is produced for these: there is no message to attach it to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// Zero-length payload.
    #[error("empty payload")]
    Empty,

    /// Not JSON.
    #[error("payload is not valid JSON: {0}")]
    Syntax(String),

    /// JSON, but not the message shape (missing field, wrong type, negative sequence).
    #[error("payload does not match the message shape: {0}")]
    Shape(String),
}

impl IngestError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Empty => "empty",
            IngestError::Syntax(_) => "syntax",
            IngestError::Shape(_) => "shape",
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Data => IngestError::Shape(err.to_string()),
            Category::Io | Category::Syntax | Category::Eof => IngestError::Syntax(err.to_string()),
        }
    }
}
