//! Mutation executor
//!
//! Runs write operations against the data source and reconciles the cache:
//! on success the affected keys are invalidated, on failure an optimistic
//! change is rolled back to its exact pre-transform snapshot.

use crate::cache::QueryCache;
use crate::error::MutationError;
use crate::key::QueryKey;
use crate::source::DataSource;
use std::fmt;

/// Local transform applied to cached data before the write resolves
pub type OptimisticFn<V> = Box<dyn FnOnce(&V) -> V + Send>;

/// A write request against one resource
pub struct MutationRequest<P, V> {
    /// Key of the resource being mutated
    pub target_key: QueryKey,
    /// Name of the data source operation
    pub operation: String,
    /// Operation input
    pub payload: P,
    also_invalidate: Vec<QueryKey>,
    optimistic: Option<OptimisticFn<V>>,
}

impl<P, V> MutationRequest<P, V> {
    /// Create request
    #[inline]
    #[must_use]
    pub fn new(target_key: QueryKey, operation: impl Into<String>, payload: P) -> Self {
        Self {
            target_key,
            operation: operation.into(),
            payload,
            also_invalidate: Vec::new(),
            optimistic: None,
        }
    }

    /// Also invalidate `key` when the write succeeds
    #[inline]
    #[must_use]
    pub fn also_invalidate(mut self, key: QueryKey) -> Self {
        self.also_invalidate.push(key);
        self
    }

    /// Apply `transform` to the cached target data before the write resolves
    #[inline]
    #[must_use]
    pub fn optimistic<F>(mut self, transform: F) -> Self
    where
        F: FnOnce(&V) -> V + Send + 'static,
    {
        self.optimistic = Some(Box::new(transform));
        self
    }

    /// Check if an optimistic transform is attached
    #[inline]
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.optimistic.is_some()
    }

    /// Keys invalidated on success: the target first, then extras, without
    /// duplicates
    #[must_use]
    pub fn invalidation_keys(&self) -> Vec<QueryKey> {
        let mut keys = vec![self.target_key.clone()];
        for key in &self.also_invalidate {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

impl<P: fmt::Debug, V> fmt::Debug for MutationRequest<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRequest")
            .field("target_key", &self.target_key)
            .field("operation", &self.operation)
            .field("payload", &self.payload)
            .field("also_invalidate", &self.also_invalidate)
            .field("optimistic", &self.optimistic.is_some())
            .finish()
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<V> {
    /// Operation that ran
    pub operation: String,
    /// Value returned by the data source
    pub response: V,
    /// Keys marked stale
    pub invalidated: Vec<QueryKey>,
    /// Whether an optimistic value was shown while the write was pending
    pub optimistic: bool,
}

/// Executes [`MutationRequest`]s against a [`QueryCache`]'s data source
#[derive(Debug)]
pub struct MutationExecutor<S: DataSource> {
    cache: QueryCache<S>,
}

impl<S: DataSource> Clone for MutationExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<S: DataSource> MutationExecutor<S> {
    /// Create executor over `cache`
    #[inline]
    #[must_use]
    pub fn new(cache: QueryCache<S>) -> Self {
        Self { cache }
    }

    /// Cache this executor reconciles
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &QueryCache<S> {
        &self.cache
    }

    /// Run `request`
    ///
    /// Dropping the returned future mid-write restores the optimistic
    /// snapshot and marks the target stale.
    ///
    /// # Errors
    /// - `MutationError::Failed` if the data source rejects the write; any
    ///   optimistic change has been rolled back by then and no other entry
    ///   was touched
    pub async fn execute(
        &self,
        request: MutationRequest<S::Payload, S::Value>,
    ) -> Result<MutationOutcome<S::Value>, MutationError> {
        let invalidation_keys = request.invalidation_keys();
        let MutationRequest {
            target_key,
            operation,
            payload,
            optimistic,
            ..
        } = request;

        let hold = match optimistic {
            Some(transform) => self.cache.begin_optimistic(&target_key, transform).await,
            None => None,
        };
        let applied = hold.is_some();

        tracing::debug!(
            operation = %operation,
            key = %target_key,
            optimistic = applied,
            "executing mutation"
        );

        match self.cache.source().execute(&operation, payload).await {
            Ok(response) => {
                if let Some(hold) = hold {
                    hold.confirm();
                }
                self.cache.invalidate(&invalidation_keys);
                tracing::info!(operation = %operation, key = %target_key, "mutation succeeded");

                Ok(MutationOutcome {
                    operation,
                    response,
                    invalidated: invalidation_keys,
                    optimistic: applied,
                })
            }
            Err(source) => {
                if let Some(hold) = hold {
                    hold.roll_back();
                }
                tracing::error!(
                    operation = %operation,
                    key = %target_key,
                    error = %source,
                    rolled_back = applied,
                    "mutation failed"
                );

                Err(MutationError::Failed {
                    operation,
                    key: target_key,
                    rolled_back: applied,
                    source,
                })
            }
        }
    }
}
