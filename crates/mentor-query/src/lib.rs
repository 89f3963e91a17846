//! Mentor Query
//!
//! Query-key addressed read-through cache with optimistic mutations. Every
//! dashboard page reads through [`QueryCache`] and writes through
//! [`MutationExecutor`]; both sit on a swappable [`DataSource`].
//!
//! # Architecture
//!
//! ```text
//! view ──ensure/fetch/subscribe──► QueryCache ──fetch──► DataSource
//!   │                                  ▲
//!   └──execute──► MutationExecutor ────┘ invalidate / rollback
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use mentor_query::{MutationExecutor, MutationRequest, QueryCache, QueryKey};
//!
//! # async fn example(source: std::sync::Arc<MySource>) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = QueryCache::new(source);
//! let tasks = cache.fetch(&QueryKey::new("tasks")).await?;
//!
//! let executor = MutationExecutor::new(cache.clone());
//! executor
//!     .execute(MutationRequest::new(QueryKey::new("tasks"), "update_task_status", payload))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod entry;
pub mod error;
pub mod key;
pub mod mutation;
pub mod source;

// Re-exports for convenience
pub use cache::{CacheConfig, CacheStats, QueryCache, Subscription};
pub use entry::{QueryEntry, QueryStatus};
pub use error::{FetchResult, MutationError, SourceError};
pub use key::{KeyPart, QueryKey};
pub use mutation::{MutationExecutor, MutationOutcome, MutationRequest, OptimisticFn};
pub use source::DataSource;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the query layer
    pub use crate::cache::{CacheConfig, QueryCache, Subscription};
    pub use crate::entry::{QueryEntry, QueryStatus};
    pub use crate::error::{MutationError, SourceError};
    pub use crate::key::QueryKey;
    pub use crate::mutation::{MutationExecutor, MutationOutcome, MutationRequest};
    pub use crate::source::DataSource;
}
