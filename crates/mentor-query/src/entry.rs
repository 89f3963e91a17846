//! Cached state for one query key

use crate::error::SourceError;
use crate::key::QueryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`QueryEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Never fetched
    #[default]
    Idle,
    /// First fetch outstanding, no data yet
    Loading,
    /// Data available
    Success,
    /// Last fetch failed
    Error,
}

/// Snapshot of one cache entry
///
/// `data` is present only when `status == Success` and `error` only when
/// `status == Error`. A background refetch of a success entry keeps the data
/// and sets `is_fetching`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEntry<V> {
    /// Address of the entry
    pub key: QueryKey,
    /// Lifecycle status
    pub status: QueryStatus,
    /// Last successful payload
    pub data: Option<V>,
    /// Last failure
    pub error: Option<SourceError>,
    /// When the last successful fetch settled
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// A fetch for this key is outstanding
    pub is_fetching: bool,
    /// Entry was invalidated (or aged out) and will be refetched
    pub is_stale: bool,
}

impl<V> QueryEntry<V> {
    /// Create idle entry
    #[inline]
    #[must_use]
    pub fn idle(key: QueryKey) -> Self {
        Self {
            key,
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            is_fetching: false,
            is_stale: false,
        }
    }

    /// Check status is loading
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Check status is success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Check status is error
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.is_fetching = true;
        if self.status != QueryStatus::Success {
            self.status = QueryStatus::Loading;
            self.data = None;
            self.error = None;
        }
    }

    pub(crate) fn settle(&mut self, result: Result<V, SourceError>, at: DateTime<Utc>) {
        self.is_fetching = false;
        match result {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = Some(data);
                self.error = None;
                self.last_fetched_at = Some(at);
            }
            Err(error) => {
                self.status = QueryStatus::Error;
                self.data = None;
                self.error = Some(error);
            }
        }
    }
}
