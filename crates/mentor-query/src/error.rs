//! Error types for the query layer
//!
//! - [`SourceError`]: rejection from a data source (fetch or write)
//! - [`MutationError`]: failed mutation, after rollback

use crate::key::QueryKey;

/// Rejection reported by a [`DataSource`](crate::DataSource)
///
/// Cloneable because one fetch resolution is shared by every caller attached
/// to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// No fetcher registered for resource
    #[error("unknown resource: '{0}'")]
    UnknownResource(String),

    /// Key parameters do not fit the resource
    #[error("invalid parameters for {key}: {reason}")]
    InvalidParams { key: QueryKey, reason: String },

    /// No write operation with this name
    #[error("unknown operation: '{0}'")]
    UnknownOperation(String),

    /// Write payload failed validation
    #[error("invalid payload for {operation}: {reason}")]
    InvalidPayload { operation: String, reason: String },

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Source rejected the request
    #[error("{target} rejected: {reason}")]
    Rejected { target: String, reason: String },

    /// Source could not be reached
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Create invalid params error
    pub fn invalid_params(key: &QueryKey, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Create invalid payload error
    pub fn invalid_payload(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create rejection error
    pub fn rejected(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Check if a user-triggered retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Unavailable(_))
    }
}

/// Failed mutation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Data source rejected the write
    #[error("mutation '{operation}' on {key} failed: {source}")]
    Failed {
        /// Operation name
        operation: String,
        /// Target key
        key: QueryKey,
        /// Whether an optimistic change was undone
        rolled_back: bool,
        /// Underlying rejection
        #[source]
        source: SourceError,
    },
}

impl MutationError {
    /// Underlying data source error
    #[inline]
    #[must_use]
    pub fn source_error(&self) -> &SourceError {
        match self {
            Self::Failed { source, .. } => source,
        }
    }

    /// Whether an optimistic change was rolled back
    #[inline]
    #[must_use]
    pub fn rolled_back(&self) -> bool {
        match self {
            Self::Failed { rolled_back, .. } => *rolled_back,
        }
    }
}

/// Result type alias for fetches
pub type FetchResult<V> = Result<V, SourceError>;
