//! Dashboard error types

use crate::config::ConfigError;
use mentor_flags::FlagError;
use mentor_query::{MutationError, QueryKey, SourceError};
use thiserror::Error;

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Main dashboard error type
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Reading a resource failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// A write failed
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// The source answered with a value of the wrong shape
    #[error("unexpected payload for {key}: got {actual}")]
    UnexpectedPayload {
        /// Key that was read
        key: QueryKey,
        /// Variant that came back
        actual: &'static str,
    },

    /// No record with this id
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Requested id
        id: String,
    },

    /// A write payload could not be encoded
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Flag helper rejected a value
    #[error("flag error: {0}")]
    Flags(#[from] FlagError),

    /// Logging could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

impl DashboardError {
    /// Create a not found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::Mutation(e) => e.source_error().is_retryable(),
            _ => false,
        }
    }

    /// Whether an optimistic change was undone before this error surfaced
    #[inline]
    #[must_use]
    pub fn rolled_back(&self) -> bool {
        matches!(self, Self::Mutation(e) if e.rolled_back())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_fetch_is_retryable() {
        let err = DashboardError::from(SourceError::rejected("tasks", "busy"));
        assert!(err.is_retryable());
        assert!(!err.rolled_back());
    }

    #[test]
    fn not_found_names_the_record() {
        let err = DashboardError::not_found("task", "task-99");
        assert_eq!(err.to_string(), "task not found: task-99");
        assert!(!err.is_retryable());
    }

    #[test]
    fn mutation_exposes_rollback() {
        let err = DashboardError::from(MutationError::Failed {
            operation: "update_task_status".into(),
            key: QueryKey::new("tasks"),
            rolled_back: true,
            source: SourceError::rejected("update_task_status", "injected failure"),
        });
        assert!(err.rolled_back());
    }
}
