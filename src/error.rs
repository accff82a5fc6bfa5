//! Unified error type for the query engine.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// A corrected-usage hint attached to validation errors.
/// Every validation error carries at least one so MCP clients can
/// self-correct without a docs round-trip.
#[derive(Serialize, Debug, Clone)]
pub struct CommonMistake {
    pub mistake: String,
    pub corrected: String,
}

/// All errors that can occur while answering a query.
#[derive(Error, Debug)]
pub enum LciError {
    /// Malformed or conflicting arguments.
    #[error("Invalid argument '{field}': {message}")]
    Validation {
        field: String,
        message: String,
        value: String,
        code: &'static str,
        common_mistakes: Vec<CommonMistake>,
    },

    /// Index not loaded yet, or indexing failed.
    #[error("Index not available: {0}")]
    IndexUnavailable(String),

    /// Object ID or symbol name could not be resolved.
    #[error("Not found: {0}")]
    NotFound(String),

    /// wait_for_completion exceeded its budget.
    #[error("Timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// Caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,

    /// Unexpected failure; logged with a correlation marker.
    #[error("Internal error [{correlation}]: {message}")]
    Internal {
        correlation: String,
        message: String,
    },

    /// I/O error (file read, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

static CORRELATION_SEQ: AtomicU64 = AtomicU64::new(1);

impl LciError {
    /// Build a validation error with one corrected example.
    pub fn validation(
        field: &str,
        message: impl Into<String>,
        value: impl Into<String>,
        code: &'static str,
        mistakes: Vec<CommonMistake>,
    ) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
            value: value.into(),
            code,
            common_mistakes: mistakes,
        }
    }

    /// Build an internal error with a fresh correlation marker.
    pub fn internal(message: impl Into<String>) -> Self {
        let seq = CORRELATION_SEQ.fetch_add(1, Ordering::Relaxed);
        Self::Internal {
            correlation: format!("lci-{:06x}", seq),
            message: message.into(),
        }
    }

    /// Short machine-readable kind tag for the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal { .. } => "internal",
            Self::Io(_) => "io",
            Self::InvalidRegex { .. } => "invalid_regex",
        }
    }

    /// Render as a structured tool-result payload so MCP clients can
    /// surface guidance. Internal errors stay opaque on the wire; the
    /// correlation marker links them back to the stderr log.
    pub fn structured(&self) -> Value {
        let mut obj = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        match self {
            Self::Validation {
                field,
                value,
                code,
                common_mistakes,
                ..
            } => {
                obj["error"]["field"] = json!(field);
                obj["error"]["value"] = json!(value);
                obj["error"]["code"] = json!(code);
                obj["commonMistakes"] = json!(common_mistakes
                    .iter()
                    .map(|m| json!({ "mistake": m.mistake, "corrected": m.corrected }))
                    .collect::<Vec<_>>());
            }
            Self::IndexUnavailable(_) => {
                obj["error"]["hint"] = json!(
                    "Check --dir and directory permissions, or wait for auto-indexing to complete."
                );
            }
            Self::Internal { correlation, .. } => {
                obj["error"]["message"] = json!(format!("Internal error [{}]", correlation));
            }
            _ => {}
        }
        obj
    }
}
