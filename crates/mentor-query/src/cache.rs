//! Read-through query cache
//!
//! Maps a [`QueryKey`] to a [`QueryEntry`] and guarantees:
//! - at most one outstanding fetch per key (concurrent callers attach to it)
//! - invalidation is exact per key and never touches other entries
//! - subscribed keys are refetched on invalidation, others lazily
//! - entries outlive their subscribers
//!
//! All entry state lives behind one mutex. No lock is held across an
//! `.await` and subscriber callbacks run after the lock is released.

use crate::entry::{QueryEntry, QueryStatus};
use crate::error::SourceError;
use crate::key::QueryKey;
use crate::source::DataSource;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, SourceError>>>;
type Callback<V> = Arc<dyn Fn(&QueryEntry<V>) + Send + Sync>;
type Notification<V> = (Vec<Callback<V>>, QueryEntry<V>);

/// Cache tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which a success entry counts as stale; `None` keeps it
    /// fresh until invalidated
    pub stale_after: Option<Duration>,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With stale time
    #[inline]
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: usize,
    /// Fetches currently outstanding
    pub in_flight: usize,
    /// Fetches issued since creation
    pub fetches_started: u64,
}

struct Slot<V> {
    entry: QueryEntry<V>,
    generation: u64,
    in_flight: Option<SharedFetch<V>>,
    subscribers: BTreeMap<u64, Callback<V>>,
    holds: usize,
    refetch_pending: bool,
}

impl<V> Slot<V> {
    fn new(key: QueryKey) -> Self {
        Self {
            entry: QueryEntry::idle(key),
            generation: 0,
            in_flight: None,
            subscribers: BTreeMap::new(),
            holds: 0,
            refetch_pending: false,
        }
    }
}

struct Inner<S: DataSource> {
    source: Arc<S>,
    config: CacheConfig,
    slots: Mutex<HashMap<QueryKey, Slot<S::Value>>>,
    next_subscriber: AtomicU64,
    fetches_started: AtomicU64,
}

impl<S: DataSource> Inner<S> {
    fn is_aged(&self, entry: &QueryEntry<S::Value>) -> bool {
        match (self.config.stale_after, entry.last_fetched_at) {
            (Some(limit), Some(at)) => Utc::now()
                .signed_duration_since(at)
                .to_std()
                .is_ok_and(|age| age >= limit),
            _ => false,
        }
    }

    fn needs_fetch(&self, slot: &Slot<S::Value>) -> bool {
        match slot.entry.status {
            QueryStatus::Idle | QueryStatus::Error => true,
            QueryStatus::Loading => false,
            QueryStatus::Success => slot.entry.is_stale || self.is_aged(&slot.entry),
        }
    }

    fn snapshot(&self, slot: &Slot<S::Value>) -> QueryEntry<S::Value> {
        let mut entry = slot.entry.clone();
        if entry.is_success() && self.is_aged(&entry) {
            entry.is_stale = true;
        }
        entry
    }

    fn notice(&self, slot: &Slot<S::Value>) -> Option<Notification<S::Value>> {
        if slot.subscribers.is_empty() {
            return None;
        }
        Some((
            slot.subscribers.values().cloned().collect(),
            self.snapshot(slot),
        ))
    }

    /// Issue the fetch for `key`; caller holds the lock and has checked that
    /// nothing is in flight.
    fn start_fetch(
        this: &Arc<Self>,
        key: &QueryKey,
        slot: &mut Slot<S::Value>,
    ) -> SharedFetch<S::Value> {
        let generation = slot.generation;
        let weak: Weak<Self> = Arc::downgrade(this);
        let source = Arc::clone(&this.source);
        let fetch_key = key.clone();

        let fetch = async move {
            let result = source.fetch(&fetch_key).await;
            if let Some(inner) = weak.upgrade() {
                Self::settle(&inner, &fetch_key, generation, result.clone());
            }
            result
        }
        .boxed()
        .shared();

        slot.in_flight = Some(fetch.clone());
        slot.refetch_pending = false;
        slot.entry.begin_fetch();
        this.fetches_started.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(key = %key, generation, "query fetch started");

        // Driven independently so the fetch completes even if every caller
        // and subscriber goes away.
        tokio::spawn(fetch.clone());

        fetch
    }

    fn settle(
        this: &Arc<Self>,
        key: &QueryKey,
        generation: u64,
        result: Result<S::Value, SourceError>,
    ) {
        let notes = {
            let mut slots = this.slots.lock();
            let Some(slot) = slots.get_mut(key) else {
                return;
            };

            slot.in_flight = None;
            if let Err(error) = &result {
                tracing::warn!(key = %key, %error, "query fetch failed");
            } else {
                tracing::debug!(key = %key, generation, "query fetch settled");
            }
            slot.entry.settle(result, Utc::now());

            let superseded = slot.generation != generation;
            slot.entry.is_stale = superseded;
            if superseded && slot.holds == 0 && !slot.subscribers.is_empty() {
                tracing::debug!(key = %key, "entry invalidated during fetch, refetching");
                Self::start_fetch(this, key, slot);
            }
            this.notice(slot)
        };
        dispatch(notes);
    }

    fn invalidate_slot(
        this: &Arc<Self>,
        key: &QueryKey,
        slot: &mut Slot<S::Value>,
    ) -> Option<Notification<S::Value>> {
        slot.generation += 1;
        slot.entry.is_stale = true;
        let wanted = !slot.subscribers.is_empty() || slot.refetch_pending;
        if slot.in_flight.is_none() && wanted {
            if slot.holds == 0 {
                Self::start_fetch(this, key, slot);
            } else {
                slot.refetch_pending = true;
            }
        }
        this.notice(slot)
    }
}

fn dispatch<V>(notes: Option<Notification<V>>) {
    if let Some((callbacks, entry)) = notes {
        for callback in callbacks {
            callback(&entry);
        }
    }
}

enum Pending<V> {
    Ready(V),
    Wait(SharedFetch<V>),
}

enum OptimisticStep<V> {
    Wait(SharedFetch<V>),
    Applied(QueryEntry<V>, Option<Notification<V>>),
}

/// Process-wide read-through cache over a [`DataSource`]
///
/// Cloning is cheap and shares the same entries. Operations that may start a
/// fetch spawn onto the ambient Tokio runtime and must be called from within
/// one.
pub struct QueryCache<S: DataSource> {
    inner: Arc<Inner<S>>,
}

impl<S: DataSource> Clone for QueryCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DataSource> fmt::Debug for QueryCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<S: DataSource> QueryCache<S> {
    /// Create cache with default configuration
    #[inline]
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, CacheConfig::default())
    }

    /// Create cache with explicit configuration
    #[must_use]
    pub fn with_config(source: Arc<S>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                slots: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
                fetches_started: AtomicU64::new(0),
            }),
        }
    }

    /// Underlying data source
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    /// Cache configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Return the entry for `key`, scheduling a fetch if it is missing,
    /// stale, idle or failed
    ///
    /// A fetch already outstanding for `key` is never duplicated.
    pub fn ensure(&self, key: &QueryKey) -> QueryEntry<S::Value> {
        let (entry, notes) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone()));

            let mut notes = None;
            if slot.in_flight.is_none() && self.inner.needs_fetch(slot) {
                if slot.holds == 0 {
                    Inner::start_fetch(&self.inner, key, slot);
                    notes = self.inner.notice(slot);
                } else {
                    slot.refetch_pending = true;
                }
            }
            (self.inner.snapshot(slot), notes)
        };
        dispatch(notes);
        entry
    }

    /// Ensure `key` and wait for its resolution
    ///
    /// Fresh cached data resolves immediately. A caller arriving while a
    /// fetch is outstanding receives that fetch's resolution.
    pub async fn fetch(&self, key: &QueryKey) -> Result<S::Value, SourceError> {
        let (pending, notes) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone()));

            if let Some(in_flight) = slot.in_flight.clone() {
                (Pending::Wait(in_flight), None)
            } else {
                let needs_fetch = self.inner.needs_fetch(slot);
                match (slot.entry.data.clone(), needs_fetch, slot.holds > 0) {
                    (Some(data), false, _) => (Pending::Ready(data), None),
                    (Some(data), true, true) => {
                        slot.refetch_pending = true;
                        (Pending::Ready(data), None)
                    }
                    _ => {
                        let fetch = Inner::start_fetch(&self.inner, key, slot);
                        (Pending::Wait(fetch), self.inner.notice(slot))
                    }
                }
            }
        };
        dispatch(notes);

        match pending {
            Pending::Ready(data) => Ok(data),
            Pending::Wait(fetch) => fetch.await,
        }
    }

    /// Synchronous read of the current state; never fetches
    #[must_use]
    pub fn get_snapshot(&self, key: &QueryKey) -> QueryEntry<S::Value> {
        let slots = self.inner.slots.lock();
        slots.get(key).map_or_else(
            || QueryEntry::idle(key.clone()),
            |slot| self.inner.snapshot(slot),
        )
    }

    /// Mark the given entries stale
    ///
    /// Subscribed keys are refetched now (or once their outstanding fetch
    /// settles), the rest on their next [`ensure`](Self::ensure). Keys never
    /// cached are ignored. Returns the number of entries invalidated.
    pub fn invalidate(&self, keys: &[QueryKey]) -> usize {
        let mut count = 0;
        let mut notes = Vec::new();
        {
            let mut slots = self.inner.slots.lock();
            for key in keys {
                if let Some(slot) = slots.get_mut(key) {
                    count += 1;
                    notes.push(Inner::invalidate_slot(&self.inner, key, slot));
                }
            }
        }
        tracing::debug!(count, "invalidated query keys");
        notes.into_iter().for_each(dispatch);
        count
    }

    /// Mark stale every entry whose key starts with `prefix`
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let keys: Vec<QueryKey> = {
            let slots = self.inner.slots.lock();
            slots
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned()
                .collect()
        };
        self.invalidate(&keys)
    }

    /// Register `callback` for every transition of `key`
    ///
    /// Dropping the returned [`Subscription`] unsubscribes. Subscribing does
    /// not fetch; pair it with [`ensure`](Self::ensure).
    pub fn subscribe<F>(&self, key: &QueryKey, callback: F) -> Subscription
    where
        F: Fn(&QueryEntry<S::Value>) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        {
            let mut slots = self.inner.slots.lock();
            slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone()))
                .subscribers
                .insert(id, Arc::new(callback));
        }

        let weak = Arc::downgrade(&self.inner);
        let unsubscribe_key = key.clone();
        Subscription {
            key: key.clone(),
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Some(slot) = inner.slots.lock().get_mut(&unsubscribe_key) {
                        slot.subscribers.remove(&id);
                    }
                }
            })),
        }
    }

    /// Number of live subscribers for `key`
    #[must_use]
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .slots
            .lock()
            .get(key)
            .map_or(0, |slot| slot.subscribers.len())
    }

    /// Check if an entry exists for `key`
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.slots.lock().contains_key(key)
    }

    /// All cached keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.inner.slots.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let slots = self.inner.slots.lock();
        CacheStats {
            entry_count: slots.len(),
            in_flight: slots.values().filter(|s| s.in_flight.is_some()).count(),
            fetches_started: self.inner.fetches_started.load(Ordering::SeqCst),
        }
    }

    /// Apply `transform` to the cached data of `key` and hold the key until
    /// the returned [`OptimisticHold`] is released
    ///
    /// Waits for an outstanding fetch to settle first so it cannot overwrite
    /// the optimistic value. Returns `None` when there was no data to
    /// transform (nothing is held then).
    pub(crate) async fn begin_optimistic<F>(
        &self,
        key: &QueryKey,
        transform: F,
    ) -> Option<OptimisticHold<S>>
    where
        F: FnOnce(&S::Value) -> S::Value,
    {
        let mut transform = Some(transform);
        loop {
            let step = {
                let mut slots = self.inner.slots.lock();
                let slot = slots.get_mut(key)?;
                if let Some(in_flight) = slot.in_flight.clone() {
                    OptimisticStep::Wait(in_flight)
                } else {
                    let (Some(current), Some(apply)) =
                        (slot.entry.data.as_ref(), transform.take())
                    else {
                        return None;
                    };
                    let snapshot = slot.entry.clone();
                    let next = apply(current);
                    slot.entry.data = Some(next);
                    slot.holds += 1;
                    OptimisticStep::Applied(snapshot, self.inner.notice(slot))
                }
            };

            match step {
                OptimisticStep::Wait(in_flight) => {
                    // Outcome is irrelevant here, only that it settled.
                    let _ = in_flight.await;
                }
                OptimisticStep::Applied(snapshot, notes) => {
                    tracing::debug!(key = %key, "optimistic update applied");
                    dispatch(notes);
                    return Some(OptimisticHold {
                        cache: self.clone(),
                        key: key.clone(),
                        snapshot: Some(snapshot),
                    });
                }
            }
        }
    }

    fn release(&self, key: &QueryKey, release: Release<S::Value>) {
        let notes = {
            let mut slots = self.inner.slots.lock();
            let Some(slot) = slots.get_mut(key) else {
                return;
            };
            slot.holds = slot.holds.saturating_sub(1);

            match release {
                // The caller invalidates next, which issues any refetch.
                Release::Confirmed => None,
                Release::RolledBack(snapshot) => {
                    let invalidated_meanwhile = slot.entry.is_stale;
                    slot.entry = snapshot;
                    slot.entry.is_stale |= invalidated_meanwhile;
                    tracing::debug!(key = %key, "optimistic update rolled back");
                    self.resume(key, slot);
                    self.inner.notice(slot)
                }
                Release::Abandoned(snapshot) => {
                    // Outcome of the write is unknown, so the restored value
                    // is stale.
                    slot.entry = snapshot;
                    slot.entry.is_stale = true;
                    slot.generation += 1;
                    slot.refetch_pending |= !slot.subscribers.is_empty();
                    tracing::warn!(key = %key, "optimistic write abandoned, restored snapshot");
                    self.resume(key, slot);
                    self.inner.notice(slot)
                }
            }
        };
        dispatch(notes);
    }

    /// Start a refetch deferred by holds once the last one is gone
    fn resume(&self, key: &QueryKey, slot: &mut Slot<S::Value>) {
        let ready = slot.holds == 0 && slot.refetch_pending && slot.in_flight.is_none();
        // Without a runtime the pending flag stays set for the next `ensure`.
        if ready && tokio::runtime::Handle::try_current().is_ok() {
            Inner::start_fetch(&self.inner, key, slot);
        }
    }
}

/// How an optimistic hold ends
enum Release<V> {
    Confirmed,
    RolledBack(QueryEntry<V>),
    Abandoned(QueryEntry<V>),
}

/// Hold on one key while its optimistic value is shown
///
/// Dropping it without [`confirm`](Self::confirm) or
/// [`roll_back`](Self::roll_back), as happens when the mutation future is
/// cancelled, restores the snapshot and marks the entry stale.
pub(crate) struct OptimisticHold<S: DataSource> {
    cache: QueryCache<S>,
    key: QueryKey,
    snapshot: Option<QueryEntry<S::Value>>,
}

impl<S: DataSource> OptimisticHold<S> {
    /// Write succeeded; keep the optimistic value until invalidation
    pub(crate) fn confirm(mut self) {
        if self.snapshot.take().is_some() {
            self.cache.release(&self.key, Release::Confirmed);
        }
    }

    /// Write failed; restore the exact pre-transform entry
    pub(crate) fn roll_back(mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.cache.release(&self.key, Release::RolledBack(snapshot));
        }
    }
}

impl<S: DataSource> Drop for OptimisticHold<S> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.cache.release(&self.key, Release::Abandoned(snapshot));
        }
    }
}

impl<S: DataSource> fmt::Debug for OptimisticHold<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticHold")
            .field("key", &self.key)
            .field("held", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}

/// Registration of interest in one key
///
/// Unsubscribes on drop. The entry itself stays cached.
pub struct Subscription {
    key: QueryKey,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Key this subscription watches
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Unsubscribe now
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
