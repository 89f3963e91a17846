//! Dashboard facade
//!
//! One method per page read and per write. Reads go through the shared
//! [`QueryCache`]; writes go through the [`MutationExecutor`] and invalidate
//! the pages they affect.

use crate::config::{DashboardConfig, FlagsBackendKind, FlagsSettings};
use crate::error::{DashboardError, Result};
use mentor_flags::{FileBackend, FlagStore, MemoryBackend, StorageBackend, UnavailableBackend};
use mentor_query::{
    CacheConfig, CacheStats, DataSource, MutationExecutor, MutationRequest, QueryCache, QueryEntry,
    QueryKey, Subscription,
};
use mentor_source::{
    keys, operations, Analytics, Earnings, Mentee, MessageThread, MockDataSource, NewSession,
    Overview, Resource, Session, Task, TaskStatus, TaskStatusChange, TaskStatusUpdate, TaskType,
    Thread, ViewData,
};
use std::sync::Arc;
use tracing::{info, warn};

/// A data source serving dashboard resources
pub trait DashboardSource: DataSource<Value = ViewData, Payload = serde_json::Value> {}

impl<T> DashboardSource for T where T: DataSource<Value = ViewData, Payload = serde_json::Value> {}

/// Open the flag store described by `settings`
///
/// A file that cannot be opened degrades to an unavailable store.
#[must_use]
pub fn open_flags(settings: &FlagsSettings) -> FlagStore {
    let backend: Arc<dyn StorageBackend> = match settings.backend {
        FlagsBackendKind::Memory => Arc::new(MemoryBackend::new()),
        FlagsBackendKind::Unavailable => Arc::new(UnavailableBackend::default()),
        FlagsBackendKind::File => match FileBackend::open(&settings.path) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                warn!(path = %settings.path.display(), error = %e, "flag file unusable, flags disabled");
                Arc::new(UnavailableBackend::new(e.to_string()))
            }
        },
    };
    FlagStore::new(backend)
}

/// Which tasks the board shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only this product
    pub kind: Option<TaskType>,
    /// Only this mentee
    pub mentee_id: Option<String>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

impl TaskFilter {
    /// Filter matching everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a product
    #[must_use]
    pub fn with_kind(mut self, kind: TaskType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// With a mentee
    #[must_use]
    pub fn with_mentee(mut self, mentee_id: impl Into<String>) -> Self {
        self.mentee_id = Some(mentee_id.into());
        self
    }

    /// With a text search
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Whether `task` passes
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.kind.is_some_and(|kind| task.kind != kind) {
            return false;
        }
        if self.mentee_id.as_ref().is_some_and(|id| &task.mentee_id != id) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// One kanban column
#[derive(Debug, Clone, PartialEq)]
pub struct TaskColumn {
    /// Column status
    pub status: TaskStatus,
    /// Tasks in board order
    pub tasks: Vec<Task>,
}

/// Kanban board of filtered tasks
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBoard {
    /// One column per status, in column order
    pub columns: Vec<TaskColumn>,
    /// Unfiltered task count per product tab
    pub tab_counts: Vec<(TaskType, usize)>,
}

impl TaskBoard {
    /// Group `tasks` passing `filter` into columns
    #[must_use]
    pub fn build(tasks: &[Task], filter: &TaskFilter) -> Self {
        let columns = TaskStatus::ALL
            .into_iter()
            .map(|status| TaskColumn {
                status,
                tasks: tasks
                    .iter()
                    .filter(|t| t.status == status && filter.matches(t))
                    .cloned()
                    .collect(),
            })
            .collect();
        let tab_counts = TaskType::ALL
            .into_iter()
            .map(|kind| (kind, tasks.iter().filter(|t| t.kind == kind).count()))
            .collect();
        Self {
            columns,
            tab_counts,
        }
    }

    /// Column for `status`
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map_or(&[], |c| c.tasks.as_slice())
    }

    /// Tasks shown across all columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    /// Whether no task is shown
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Task list with the status of `task_id` replaced
fn with_task_status(data: &ViewData, task_id: &str, status: TaskStatus) -> ViewData {
    match data {
        ViewData::Tasks(tasks) => ViewData::Tasks(
            tasks
                .iter()
                .map(|task| {
                    let mut task = task.clone();
                    if task.id == task_id {
                        task.status = status;
                    }
                    task
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Data layer behind every dashboard page
pub struct Dashboard<S: DataSource = MockDataSource> {
    cache: QueryCache<S>,
    executor: MutationExecutor<S>,
    flags: FlagStore,
}

impl<S: DataSource> Clone for Dashboard<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            executor: self.executor.clone(),
            flags: self.flags.clone(),
        }
    }
}

impl<S: DataSource> std::fmt::Debug for Dashboard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("cache", &self.cache)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Dashboard<MockDataSource> {
    /// Dashboard over the simulator described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        config.validate()?;
        let source = match config.source.seed {
            Some(seed) => MockDataSource::with_seed(seed),
            None => MockDataSource::new(),
        }
        .with_latency_scale(config.source.latency_scale);
        info!(
            seed = source.seed(),
            latency_scale = source.latency_scale(),
            flags = ?config.flags.backend,
            "dashboard starting"
        );
        Ok(Self::new(
            Arc::new(source),
            config.cache_config(),
            open_flags(&config.flags),
        ))
    }
}

impl<S: DashboardSource> Dashboard<S> {
    /// Dashboard over `source`
    pub fn new(source: Arc<S>, cache_config: CacheConfig, flags: FlagStore) -> Self {
        let cache = QueryCache::with_config(source, cache_config);
        Self {
            executor: MutationExecutor::new(cache.clone()),
            cache,
            flags,
        }
    }

    /// Shared query cache
    #[must_use]
    pub fn cache(&self) -> &QueryCache<S> {
        &self.cache
    }

    /// Underlying data source
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        self.cache.source()
    }

    /// Persisted flags
    #[must_use]
    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn load<T>(&self, key: QueryKey, extract: fn(ViewData) -> Option<T>) -> Result<T> {
        let data = self.cache.fetch(&key).await?;
        let actual = data.kind();
        extract(data).ok_or(DashboardError::UnexpectedPayload { key, actual })
    }

    /// Today's sessions, open queues, unread threads and at-risk mentees
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn overview(&self) -> Result<Overview> {
        self.load(keys::overview(), ViewData::into_overview).await
    }

    /// Mentee roster
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn mentees(&self) -> Result<Vec<Mentee>> {
        self.load(keys::mentees(), ViewData::into_mentees).await
    }

    /// One mentee from the roster
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or no mentee has this id.
    pub async fn mentee(&self, id: &str) -> Result<Mentee> {
        self.mentees()
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| DashboardError::not_found("mentee", id))
    }

    /// All tasks
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.load(keys::tasks(), ViewData::into_tasks).await
    }

    /// Kanban board
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn task_board(&self, filter: &TaskFilter) -> Result<TaskBoard> {
        Ok(TaskBoard::build(&self.tasks().await?, filter))
    }

    /// Session calendar
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn sessions(&self) -> Result<Vec<Session>> {
        self.load(keys::sessions(), ViewData::into_sessions).await
    }

    /// Inbox
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn messages(&self) -> Result<Vec<MessageThread>> {
        self.load(keys::messages(), ViewData::into_messages).await
    }

    /// One conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn thread(&self, id: &str) -> Result<Thread> {
        self.load(keys::thread(id), ViewData::into_thread).await
    }

    /// Cohort and per-mentee analytics
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn analytics(&self) -> Result<Analytics> {
        self.load(keys::analytics(), ViewData::into_analytics).await
    }

    /// Resource library
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn resources(&self) -> Result<Vec<Resource>> {
        self.load(keys::resources(), ViewData::into_resources).await
    }

    /// Library resources whose title, description or a tag contains `query`
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn search_resources(&self, query: &str) -> Result<Vec<Resource>> {
        let needle = query.trim().to_lowercase();
        let resources = self.resources().await?;
        if needle.is_empty() {
            return Ok(resources);
        }
        Ok(resources
            .into_iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.description.to_lowercase().contains(&needle)
                    || r.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Earnings summary, history and trend
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn earnings(&self) -> Result<Earnings> {
        self.load(keys::earnings(), ViewData::into_earnings).await
    }

    /// Current cache entry for `key`, never fetching
    #[must_use]
    pub fn snapshot(&self, key: &QueryKey) -> QueryEntry<ViewData> {
        self.cache.get_snapshot(key)
    }

    /// Subscribe to `key` and make sure it is loaded
    pub fn watch<F>(&self, key: &QueryKey, callback: F) -> Subscription
    where
        F: Fn(&QueryEntry<ViewData>) + Send + Sync + 'static,
    {
        let subscription = self.cache.subscribe(key, callback);
        self.cache.ensure(key);
        subscription
    }

    /// Start loading `keys` in the background
    pub fn prefetch(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache.ensure(key);
        }
    }

    /// Mark `keys` stale
    pub fn refresh(&self, keys: &[QueryKey]) -> usize {
        self.cache.invalidate(keys)
    }

    /// Move a task to another column
    ///
    /// The cached board shows the new column at once; it reverts if the
    /// write fails. The board and overview are refetched afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    pub async fn move_task(&self, task_id: &str, status: TaskStatus) -> Result<TaskStatusUpdate> {
        let payload = serde_json::to_value(TaskStatusChange {
            task_id: task_id.to_string(),
            status,
        })?;
        let id = task_id.to_string();
        let request = MutationRequest::new(keys::tasks(), operations::UPDATE_TASK_STATUS, payload)
            .also_invalidate(keys::overview())
            .optimistic(move |data: &ViewData| with_task_status(data, &id, status));

        let outcome = self.executor.execute(request).await?;
        let actual = outcome.response.kind();
        outcome
            .response
            .into_task_status_update()
            .ok_or(DashboardError::UnexpectedPayload {
                key: keys::tasks(),
                actual,
            })
    }

    /// Schedule a session
    ///
    /// # Errors
    ///
    /// Returns an error if the source rejects the request.
    pub async fn create_session(&self, request: NewSession) -> Result<Session> {
        let payload = serde_json::to_value(&request)?;
        let request = MutationRequest::new(keys::sessions(), operations::CREATE_SESSION, payload)
            .also_invalidate(keys::overview());

        let outcome = self.executor.execute(request).await?;
        let actual = outcome.response.kind();
        outcome
            .response
            .into_created_session()
            .ok_or(DashboardError::UnexpectedPayload {
                key: keys::sessions(),
                actual,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mentor_source::{ChecklistItem, Priority};

    fn task(id: &str, kind: TaskType, status: TaskStatus, mentee: &str) -> Task {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: id.into(),
            title: format!("Review CV for {mentee}"),
            kind,
            mentee_id: mentee.into(),
            priority: Priority::Low,
            status,
            due_date: at,
            created_at: at,
            description: "Leave comments".into(),
            checklist: vec![ChecklistItem {
                id: "c1".into(),
                text: "Read".into(),
                completed: false,
            }],
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("t1", TaskType::CvPro, TaskStatus::New, "mentee-1"),
            task("t2", TaskType::CvPro, TaskStatus::Done, "mentee-2"),
            task("t3", TaskType::GapMap, TaskStatus::InProgress, "mentee-1"),
        ]
    }

    #[test]
    fn board_groups_by_status() {
        let board = TaskBoard::build(&sample(), &TaskFilter::new());
        assert_eq!(board.columns.len(), 4);
        assert_eq!(board.len(), 3);
        assert_eq!(board.column(TaskStatus::New)[0].id, "t1");
        assert!(board.column(TaskStatus::WaitingMentee).is_empty());
    }

    #[test]
    fn filter_keeps_tab_counts() {
        let board = TaskBoard::build(&sample(), &TaskFilter::new().with_kind(TaskType::GapMap));
        assert_eq!(board.len(), 1);
        assert!(board.tab_counts.contains(&(TaskType::CvPro, 2)));
    }

    #[test]
    fn filter_by_mentee_and_search() {
        let filter = TaskFilter::new().with_mentee("mentee-1").with_search("  CV ");
        let board = TaskBoard::build(&sample(), &filter);
        assert_eq!(board.len(), 2);

        let none = TaskBoard::build(&sample(), &TaskFilter::new().with_search("interview"));
        assert!(none.is_empty());
    }

    #[test]
    fn status_transform_touches_one_task() {
        let data = ViewData::Tasks(sample());
        let moved = with_task_status(&data, "t1", TaskStatus::Done);
        let tasks = moved.into_tasks().unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[2].status, TaskStatus::InProgress);
    }

    #[test]
    fn unusable_flag_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, "not json").unwrap();
        let flags = open_flags(&FlagsSettings {
            backend: FlagsBackendKind::File,
            path,
        });
        assert_eq!(flags.backend_kind(), "unavailable");
        assert!(!flags.is_available());
    }
}
