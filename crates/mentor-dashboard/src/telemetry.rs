//! Logging setup for the binary

use crate::config::{LogFormat, LogSettings};
use crate::error::{DashboardError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `settings.level`
///
/// # Errors
///
/// Returns an error if the fallback directive does not parse.
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| DashboardError::Telemetry(format!("invalid log level '{}': {e}", settings.level))),
    }
}

/// Install the global subscriber, writing to stderr
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init(settings: &LogSettings) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(settings)?);
    let installed = match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| DashboardError::Telemetry(e.to_string()))
}
