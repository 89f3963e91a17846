//! Data source seam
//!
//! The boundary between cache logic and actual retrieval. The simulator and
//! a real network client both sit behind [`DataSource`].

use crate::error::SourceError;
use crate::key::QueryKey;
use async_trait::async_trait;

/// Asynchronous resource fetchers and write operations
///
/// Every invocation must settle exactly once, with either a value or an
/// error. Implementations do not retry and apply no timeout.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Payload delivered for a query key
    type Value: Clone + Send + Sync + 'static;

    /// Input of a write operation
    type Payload: Send + 'static;

    /// Fetch the payload addressed by `key`
    async fn fetch(&self, key: &QueryKey) -> Result<Self::Value, SourceError>;

    /// Run the write operation named `operation`
    async fn execute(
        &self,
        operation: &str,
        payload: Self::Payload,
    ) -> Result<Self::Value, SourceError>;
}
