//! Flag storage errors
//!
//! Backends report failures as [`FlagError`]; [`FlagStore`](crate::FlagStore)
//! logs them and degrades, so callers only see these from typed helpers
//! that validate input.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for backend operations
pub type FlagResult<T> = std::result::Result<T, FlagError>;

/// Flag storage error
#[derive(Error, Debug)]
pub enum FlagError {
    /// Storage is not usable in this context
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        /// Backing file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON object of strings
    #[error("corrupt storage file {path}: {reason}")]
    Corrupt {
        /// Backing file
        path: PathBuf,
        /// Parse failure
        reason: String,
    },

    /// Value could not be encoded
    #[error("failed to encode flag '{name}': {source}")]
    Encode {
        /// Flag name
        name: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Value rejected by a typed helper
    #[error("invalid value for '{name}': {reason}")]
    InvalidValue {
        /// Flag name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl FlagError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the backend cannot be used at all
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_flag() {
        let err = FlagError::invalid_value("role", "unknown role 'guest'");
        assert_eq!(err.to_string(), "invalid value for 'role': unknown role 'guest'");
        assert!(!err.is_unavailable());
        assert!(FlagError::Unavailable("private mode".into()).is_unavailable());
    }
}
