//! Dashboard configuration
//!
//! Loaded from TOML; every section and field is optional.
//!
//! ```toml
//! [cache]
//! stale_after_ms = 30000
//!
//! [source]
//! seed = 42
//! latency_scale = 0.5
//!
//! [flags]
//! backend = "file"
//! path = ".mentor-dashboard/flags.json"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use mentor_query::CacheConfig;
use mentor_source::MAX_LATENCY_SCALE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Query cache settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Entries older than this are refetched on next access; unset keeps them until invalidated
    pub stale_after_ms: Option<u64>,
}

/// Simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// Seed of generated records; unset picks a random one
    pub seed: Option<u64>,
    /// Multiplier on simulated latency, 0 disables it
    pub latency_scale: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            seed: None,
            latency_scale: 1.0,
        }
    }
}

/// Where flags are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagsBackendKind {
    /// JSON file at `flags.path`
    #[default]
    File,
    /// Process memory
    Memory,
    /// Always unavailable
    Unavailable,
}

/// Persisted flag settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlagsSettings {
    /// Backend kind
    pub backend: FlagsBackendKind,
    /// File used by the `file` backend
    pub path: PathBuf,
}

impl Default for FlagsSettings {
    fn default() -> Self {
        Self {
            backend: FlagsBackendKind::File,
            path: PathBuf::from(".mentor-dashboard/flags.json"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Query cache
    pub cache: CacheSettings,
    /// Simulated data source
    pub source: SourceSettings,
    /// Persisted flags
    pub flags: FlagsSettings,
    /// Logging
    pub logging: LogSettings,
}

impl DashboardConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema or a
    /// value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.source.latency_scale;
        if !(0.0..=MAX_LATENCY_SCALE).contains(&scale) {
            return Err(ConfigError::Invalid {
                field: "source.latency_scale",
                reason: format!("must be between 0 and {MAX_LATENCY_SCALE}, got {scale}"),
            });
        }
        if self.cache.stale_after_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cache.stale_after_ms",
                reason: "must be positive; omit it to disable expiry".to_string(),
            });
        }
        if self.flags.backend == FlagsBackendKind::File && self.flags.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "flags.path",
                reason: "required by the file backend".to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// With a fixed simulator seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.source.seed = Some(seed);
        self
    }

    /// With a latency multiplier
    #[inline]
    #[must_use]
    pub fn with_latency_scale(mut self, scale: f64) -> Self {
        self.source.latency_scale = scale;
        self
    }

    /// With entry expiry
    #[inline]
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.cache.stale_after_ms = Some(u64::try_from(stale_after.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With a flags backend
    #[inline]
    #[must_use]
    pub fn with_flags_backend(mut self, backend: FlagsBackendKind) -> Self {
        self.flags.backend = backend;
        self
    }

    /// With a flags file
    #[inline]
    #[must_use]
    pub fn with_flags_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.flags.path = path.into();
        self
    }

    /// With a log filter
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// With a log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.logging.format = format;
        self
    }

    /// Cache configuration derived from these settings
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        match self.cache.stale_after_ms {
            Some(ms) => CacheConfig::new().with_stale_after(Duration::from_millis(ms)),
            None => CacheConfig::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_is_default() {
        assert_eq!(DashboardConfig::from_toml_str("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = DashboardConfig::from_toml_str(
            r#"
            [cache]
            stale_after_ms = 1500

            [source]
            seed = 9
            latency_scale = 0.0

            [flags]
            backend = "memory"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.seed, Some(9));
        assert_eq!(config.flags.backend, FlagsBackendKind::Memory);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(
            config.cache_config().stale_after,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = DashboardConfig::from_toml_str("[cache]\nttl = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn negative_latency_is_invalid() {
        let err = DashboardConfig::from_toml_str("[source]\nlatency_scale = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "source.latency_scale",
                ..
            }
        ));
    }

    #[test]
    fn oversized_latency_is_invalid() {
        let err = DashboardConfig::from_toml_str("[source]\nlatency_scale = 1e300\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "source.latency_scale",
                ..
            }
        ));
        assert!(DashboardConfig::new()
            .with_latency_scale(MAX_LATENCY_SCALE)
            .validate()
            .is_ok());
    }

    #[test]
    fn zero_stale_time_is_invalid() {
        assert!(DashboardConfig::new()
            .with_stale_after(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn builders_compose() {
        let config = DashboardConfig::new()
            .with_seed(3)
            .with_latency_scale(0.25)
            .with_flags_backend(FlagsBackendKind::Unavailable)
            .with_log_level("debug");
        assert!(config.validate().is_ok());
        assert_eq!(config.source.seed, Some(3));
        assert_eq!(config.cache_config().stale_after, None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DashboardConfig::load("/nonexistent/mentor-dashboard.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
