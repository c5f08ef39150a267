//! Error types for Lendwise.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LendwiseError {
    /// Bad caller input (missing customer_id, unknown verdict). Never retried.
    #[error("{0}")]
    Validation(String),

    /// Static customer datasets are missing or unreadable.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The external reasoner failed or timed out.
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    /// An atomic write did not complete; the previous file content is intact.
    #[error("Failed to persist {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LendwiseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LendwiseError::Validation(_) => "validation",
            LendwiseError::DataUnavailable(_) => "data_unavailable",
            LendwiseError::Reasoning(_) => "reasoning",
            LendwiseError::Persistence { .. } => "persistence",
            LendwiseError::Io(_) => "io",
            LendwiseError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, LendwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_message_names_path() {
        let err = LendwiseError::persistence("/tmp/decisions.json", "disk full");
        assert_eq!(err.to_string(), "Failed to persist /tmp/decisions.json: disk full");
        assert_eq!(err.kind(), "persistence");
    }

    #[test]
    fn test_validation_message_is_echoed() {
        let err = LendwiseError::validation("customer_id is required");
        assert_eq!(err.to_string(), "customer_id is required");
    }
}
