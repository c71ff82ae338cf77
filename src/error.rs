//! Error taxonomy for a trend run
//!
//! Every failure in the pipeline is fatal. Components return [`TrendError`];
//! the orchestrator tags it with the [`RunStage`] it happened in so the
//! diagnostic says where the run stopped.

use crate::analyzer::RunStage;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two timestamp formats failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    Tracker,
    Commit,
}

impl std::fmt::Display for TimestampKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampKind::Tracker => f.write_str("tracker"),
            TimestampKind::Commit => f.write_str("commit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Network error talking to the issue tracker: {0}")]
    Network(String),

    #[error("Malformed tracker response: {0}")]
    MalformedResponse(String),

    #[error("Malformed {kind} timestamp: {value:?}")]
    MalformedTimestamp { kind: TimestampKind, value: String },

    #[error("Repository access failed: {0}")]
    RepositoryAccess(String),

    #[error("Failed to write output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TrendError {
    pub fn malformed_timestamp(kind: TimestampKind, value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            kind,
            value: value.into(),
        }
    }

    pub fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for TrendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TrendError::MalformedResponse(err.to_string())
        } else {
            TrendError::Network(err.to_string())
        }
    }
}

/// A [`TrendError`] tagged with the stage the run was in when it failed
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct RunError {
    pub stage: RunStage,
    #[source]
    pub source: TrendError,
}

impl RunError {
    pub fn new(stage: RunStage, source: TrendError) -> Self {
        Self { stage, source }
    }
}

pub type Result<T, E = TrendError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_names_stage() {
        let err = RunError::new(
            RunStage::Fetching,
            TrendError::Network("connection refused".to_string()),
        );
        let message = err.to_string();
        assert!(message.starts_with("FETCHING stage failed"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_malformed_timestamp_message() {
        let err = TrendError::malformed_timestamp(TimestampKind::Commit, "yesterday");
        assert_eq!(err.to_string(), "Malformed commit timestamp: \"yesterday\"");
    }
}
