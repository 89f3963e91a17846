//! Mentor Dashboard
//!
//! Configuration, logging setup and the [`Dashboard`] facade every page of
//! the mentor dashboard reads and writes through.
//!
//! # Example
//!
//! ```rust,ignore
//! use mentor_dashboard::{Dashboard, DashboardConfig};
//! use mentor_source::TaskStatus;
//!
//! let dashboard = Dashboard::from_config(&DashboardConfig::new().with_seed(42))?;
//! let overview = dashboard.overview().await?;
//! dashboard.move_task("task-3", TaskStatus::Done).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod dashboard;
pub mod error;
pub mod render;
pub mod telemetry;

pub use config::{
    CacheSettings, ConfigError, DashboardConfig, FlagsBackendKind, FlagsSettings, LogFormat,
    LogSettings, SourceSettings,
};
pub use dashboard::{open_flags, Dashboard, DashboardSource, TaskBoard, TaskColumn, TaskFilter};
pub use error::{DashboardError, Result};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
