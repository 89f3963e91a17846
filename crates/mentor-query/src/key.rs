//! Query keys
//!
//! A [`QueryKey`] is an ordered sequence of primitive identifiers: the
//! resource name followed by optional parameters. Two keys are equal iff
//! their sequences are structurally equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One primitive component of a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// Boolean parameter
    Bool(bool),
    /// Integer parameter
    Int(i64),
    /// String identifier
    Str(String),
}

impl KeyPart {
    /// Borrow as string, if this is a string part
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for KeyPart {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for KeyPart {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Cache address of one fetched result
///
/// The first part is conventionally the resource name (`"tasks"`), further
/// parts parameterize it (`["thread", "thread-1"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Create key for a resource with no parameters
    #[inline]
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self(vec![KeyPart::Str(resource.into())])
    }

    /// Create key from raw parts
    #[inline]
    #[must_use]
    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Append a parameter
    #[inline]
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Resource name (first string part), if any
    #[inline]
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.0.first().and_then(KeyPart::as_str)
    }

    /// Parameters after the resource name
    #[inline]
    #[must_use]
    pub fn params(&self) -> &[KeyPart] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// All parts
    #[inline]
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Check whether `prefix` is a (non-strict) prefix of this key
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Number of parts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if key has no parts
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl From<&str> for QueryKey {
    fn from(resource: &str) -> Self {
        Self::new(resource)
    }
}
