//! Testing utilities for the mentor dashboard workspace
//!
//! Shared test helpers, fixtures, and a scriptable data source.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mentor_flags::{FlagStore, MemoryBackend};
use mentor_query::{DataSource, QueryKey, SourceError};
use mentor_source::{ChecklistItem, MockDataSource, Priority, Task, TaskStatus, TaskType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A card on a scripted board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub status: String,
}

impl Card {
    pub fn new(id: &str, status: &str) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
        }
    }
}

/// Data source whose boards, latency and failures are set by the test
///
/// - `fetch(key)` returns the board named by the key's resource
/// - `move_card` sets a card's status, `add_card` appends one
/// - fetches can be paused and released to observe in-flight states
#[derive(Debug)]
pub struct ScriptedSource {
    boards: Mutex<HashMap<String, Vec<Card>>>,
    fetch_counts: Mutex<HashMap<QueryKey, usize>>,
    executions: AtomicUsize,
    failing_fetches: AtomicUsize,
    failing_operations: AtomicUsize,
    latency: Mutex<Duration>,
    paused: watch::Sender<bool>,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            boards: Mutex::new(HashMap::new()),
            fetch_counts: Mutex::new(HashMap::new()),
            executions: AtomicUsize::new(0),
            failing_fetches: AtomicUsize::new(0),
            failing_operations: AtomicUsize::new(0),
            latency: Mutex::new(Duration::ZERO),
            paused,
        }
    }

    /// Source with one board of `count` cards, all in `status`
    pub fn with_board(resource: &str, count: usize, status: &str) -> Self {
        let source = Self::new();
        source.set_board(
            resource,
            (1..=count)
                .map(|i| Card::new(&format!("{resource}-{i}"), status))
                .collect(),
        );
        source
    }

    pub fn set_board(&self, resource: &str, cards: Vec<Card>) {
        self.boards.lock().insert(resource.to_string(), cards);
    }

    pub fn board(&self, resource: &str) -> Vec<Card> {
        self.boards.lock().get(resource).cloned().unwrap_or_default()
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Park every fetch until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Reject the next `n` fetches
    pub fn fail_next_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    /// Reject the next `n` write operations
    pub fn fail_next_operations(&self, n: usize) {
        self.failing_operations.store(n, Ordering::SeqCst);
    }

    /// Fetches issued for `key` so far
    pub fn fetch_count(&self, key: &QueryKey) -> usize {
        self.fetch_counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetch_counts.lock().values().sum()
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    type Value = Vec<Card>;
    type Payload = Card;

    async fn fetch(&self, key: &QueryKey) -> Result<Vec<Card>, SourceError> {
        *self.fetch_counts.lock().entry(key.clone()).or_insert(0) += 1;

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|p| !*p).await;
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if Self::take_failure(&self.failing_fetches) {
            return Err(SourceError::rejected(key.to_string(), "scripted failure"));
        }

        let resource = key.resource().unwrap_or_default();
        self.boards
            .lock()
            .get(resource)
            .cloned()
            .ok_or_else(|| SourceError::UnknownResource(resource.to_string()))
    }

    async fn execute(&self, operation: &str, payload: Card) -> Result<Vec<Card>, SourceError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if Self::take_failure(&self.failing_operations) {
            return Err(SourceError::rejected(operation, "scripted failure"));
        }

        let mut boards = self.boards.lock();
        match operation {
            "move_card" => {
                let card = boards
                    .values_mut()
                    .flat_map(|cards| cards.iter_mut())
                    .find(|card| card.id == payload.id)
                    .ok_or_else(|| SourceError::NotFound(payload.id.clone()))?;
                card.status = payload.status.clone();
                Ok(vec![card.clone()])
            }
            "add_card" => {
                let resource = payload.id.split('-').next().unwrap_or_default().to_string();
                boards.entry(resource).or_default().push(payload.clone());
                Ok(vec![payload])
            }
            other => Err(SourceError::UnknownOperation(other.to_string())),
        }
    }
}

/// Move a card locally, as an optimistic transform would
pub fn move_card(cards: &[Card], id: &str, status: &str) -> Vec<Card> {
    cards
        .iter()
        .map(|card| {
            if card.id == id {
                Card::new(id, status)
            } else {
                card.clone()
            }
        })
        .collect()
}

/// Simulator with no latency and a fixed seed
pub fn instant_mock_source() -> Arc<MockDataSource> {
    Arc::new(MockDataSource::with_seed(42).with_latency_scale(0.0))
}

/// Flag store over a fresh in-memory backend
pub fn memory_flags() -> FlagStore {
    FlagStore::new(Arc::new(MemoryBackend::new()))
}

pub fn sample_task(id: &str, status: TaskStatus) -> Task {
    let due = Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).single().unwrap_or_default();
    Task {
        id: id.to_string(),
        title: format!("Review {id}"),
        kind: TaskType::CvPro,
        mentee_id: "mentee-1".to_string(),
        priority: Priority::Medium,
        status,
        due_date: due,
        created_at: due,
        description: "Sample task".to_string(),
        checklist: vec![ChecklistItem {
            id: format!("{id}-check-1"),
            text: "Read the draft".to_string(),
            completed: false,
        }],
    }
}
