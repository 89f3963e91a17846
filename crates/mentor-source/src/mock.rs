//! Simulated backend
//!
//! [`MockDataSource`] serves every dashboard resource from seeded in-memory
//! state, sleeps a per-resource latency and applies writes to its state so
//! refetches observe them.

use crate::generate;
use crate::model::{
    Mentee, MessageThread, NewSession, Overview, QueueCounts, RiskLevel, Session, SessionStatus,
    Task, TaskStatusChange, TaskStatusUpdate, Thread,
};
use crate::view::{operations, resources, ViewData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentor_query::{DataSource, QueryKey, SourceError};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Most unread threads listed on the overview
pub const OVERVIEW_UNREAD_LIMIT: usize = 5;

/// Most at-risk mentees listed on the overview
pub const OVERVIEW_AT_RISK_LIMIT: usize = 3;

/// Largest accepted latency multiplier
pub const MAX_LATENCY_SCALE: f64 = 100.0;

/// Simulated latency of a resource or operation, unscaled
#[must_use]
pub fn base_latency(target: &str) -> Option<Duration> {
    let millis = match target {
        resources::OVERVIEW => 500,
        resources::MENTEES | resources::SESSIONS | resources::MESSAGES => 300,
        resources::TASKS | resources::EARNINGS => 400,
        resources::THREAD | resources::RESOURCES => 200,
        resources::ANALYTICS => 600,
        operations::UPDATE_TASK_STATUS => 200,
        operations::CREATE_SESSION => 500,
        _ => return None,
    };
    Some(Duration::from_millis(millis))
}

/// `latency * scale`, saturating instead of panicking on overflow
fn scaled(latency: Duration, scale: f64) -> Duration {
    if scale <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(latency.as_secs_f64() * scale).unwrap_or(Duration::MAX)
}

#[derive(Debug)]
struct MockState {
    mentees: Vec<Mentee>,
    tasks: Vec<Task>,
    sessions: Vec<Session>,
    threads: Vec<MessageThread>,
    next_session: usize,
}

impl MockState {
    fn seeded(seed: u64, now: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mentees = generate::mentees(&mut rng, now);
        let tasks = generate::tasks(&mut rng, now);
        let sessions = generate::sessions(now.date_naive());
        let next_session = sessions.len() + 1;
        Self {
            mentees,
            tasks,
            sessions,
            threads: generate::threads(now),
            next_session,
        }
    }

    fn overview(&self, today: chrono::NaiveDate) -> Overview {
        Overview {
            todays_sessions: self
                .sessions
                .iter()
                .filter(|s| s.start_time.date_naive() == today)
                .cloned()
                .collect(),
            queue_counts: QueueCounts::from_tasks(&self.tasks),
            unread_messages: self
                .threads
                .iter()
                .filter(|t| t.unread_count > 0)
                .take(OVERVIEW_UNREAD_LIMIT)
                .cloned()
                .collect(),
            at_risk_mentees: self
                .mentees
                .iter()
                .filter(|m| m.risk_level == RiskLevel::High)
                .take(OVERVIEW_AT_RISK_LIMIT)
                .cloned()
                .collect(),
        }
    }

    fn thread(&self, seed: u64, id: &str) -> Result<Thread, SourceError> {
        let summary = self
            .threads
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("thread {id}")))?;
        let mut rng = StdRng::seed_from_u64(generate::seed_for(seed, id));
        Ok(generate::thread_messages(&mut rng, summary))
    }

    fn update_task_status(&mut self, change: &TaskStatusChange) -> Result<TaskStatusUpdate, SourceError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == change.task_id)
            .ok_or_else(|| SourceError::NotFound(format!("task {}", change.task_id)))?;
        task.status = change.status;
        Ok(TaskStatusUpdate {
            success: true,
            task_id: change.task_id.clone(),
            status: change.status,
        })
    }

    fn create_session(&mut self, request: NewSession) -> Result<Session, SourceError> {
        if request.mentee_ids.is_empty() {
            return Err(SourceError::invalid_payload(
                operations::CREATE_SESSION,
                "at least one mentee is required",
            ));
        }
        if request.end_time <= request.start_time {
            return Err(SourceError::invalid_payload(
                operations::CREATE_SESSION,
                "session must end after it starts",
            ));
        }
        if let Some(unknown) = request
            .mentee_ids
            .iter()
            .find(|id| !self.mentees.iter().any(|m| &m.id == *id))
        {
            return Err(SourceError::NotFound(format!("mentee {unknown}")));
        }

        let id = format!("session-{}", self.next_session);
        self.next_session += 1;
        let session = Session {
            google_meet_link: format!("https://meet.google.com/{id}"),
            id,
            kind: request.kind,
            mentee_ids: request.mentee_ids,
            start_time: request.start_time,
            end_time: request.end_time,
            objectives: request.objectives,
            status: SessionStatus::Scheduled,
        };
        self.sessions.push(session.clone());
        Ok(session)
    }
}

/// In-memory simulator of the dashboard backend
///
/// # Example
///
/// ```rust,ignore
/// let source = Arc::new(MockDataSource::with_seed(7).with_latency_scale(0.0));
/// let cache = QueryCache::new(source);
/// let tasks = cache.fetch(&keys::tasks()).await?;
/// ```
#[derive(Debug)]
pub struct MockDataSource {
    seed: u64,
    latency_scale: f64,
    state: RwLock<MockState>,
    faults: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl Default for MockDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDataSource {
    /// Simulator with a random seed and full latency
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Simulator whose generated records are fixed by `seed`
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            latency_scale: 1.0,
            state: RwLock::new(MockState::seeded(seed, Utc::now())),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Scale every simulated latency; `0.0` disables sleeping
    ///
    /// Clamped to `0.0..=MAX_LATENCY_SCALE`; non-finite values keep full
    /// latency.
    #[must_use]
    pub fn with_latency_scale(mut self, scale: f64) -> Self {
        self.latency_scale = if scale.is_finite() {
            scale.clamp(0.0, MAX_LATENCY_SCALE)
        } else {
            1.0
        };
        self
    }

    /// Seed of the generated records
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current latency scale
    #[must_use]
    pub fn latency_scale(&self) -> f64 {
        self.latency_scale
    }

    /// Reject the next `times` invocations of a resource or operation
    pub fn fail_next(&self, target: &str, times: usize) {
        if times == 0 {
            self.faults.lock().remove(target);
        } else {
            self.faults.lock().insert(target.to_string(), times);
        }
    }

    /// Invocations of a resource or operation so far, failed ones included
    #[must_use]
    pub fn call_count(&self, target: &str) -> usize {
        self.calls.lock().get(target).copied().unwrap_or(0)
    }

    /// Current tasks, bypassing latency and fault injection
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.clone()
    }

    /// Current sessions, bypassing latency and fault injection
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        self.state.read().sessions.clone()
    }

    async fn enter(&self, target: &str, latency: Duration) -> Result<(), SourceError> {
        *self.calls.lock().entry(target.to_string()).or_insert(0) += 1;

        let delay = scaled(latency, self.latency_scale);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut faults = self.faults.lock();
        if let Some(remaining) = faults.get_mut(target) {
            *remaining -= 1;
            if *remaining == 0 {
                faults.remove(target);
            }
            warn!(target = %target, "injected failure");
            return Err(SourceError::rejected(target, "injected failure"));
        }
        Ok(())
    }

    fn thread_id(key: &QueryKey) -> Result<&str, SourceError> {
        key.params()
            .first()
            .and_then(|part| part.as_str())
            .ok_or_else(|| SourceError::invalid_params(key, "thread id is required"))
    }
}

fn decode<T: DeserializeOwned>(operation: &str, payload: serde_json::Value) -> Result<T, SourceError> {
    serde_json::from_value(payload).map_err(|e| SourceError::invalid_payload(operation, e.to_string()))
}

#[async_trait]
impl DataSource for MockDataSource {
    type Value = ViewData;
    type Payload = serde_json::Value;

    async fn fetch(&self, key: &QueryKey) -> Result<ViewData, SourceError> {
        let resource = key
            .resource()
            .ok_or_else(|| SourceError::invalid_params(key, "missing resource name"))?;
        let latency = base_latency(resource)
            .filter(|_| resources::ALL.contains(&resource))
            .ok_or_else(|| SourceError::UnknownResource(resource.to_string()))?;
        if resource != resources::THREAD && !key.params().is_empty() {
            return Err(SourceError::invalid_params(key, "resource takes no parameters"));
        }
        let thread_id = if resource == resources::THREAD {
            Some(Self::thread_id(key)?)
        } else {
            None
        };

        debug!(key = %key, "simulated fetch");
        self.enter(resource, latency).await?;

        let state = self.state.read();
        let data = match (resource, thread_id) {
            (resources::THREAD, Some(id)) => ViewData::Thread(state.thread(self.seed, id)?),
            (resources::OVERVIEW, _) => ViewData::Overview(state.overview(Utc::now().date_naive())),
            (resources::MENTEES, _) => ViewData::Mentees(state.mentees.clone()),
            (resources::TASKS, _) => ViewData::Tasks(state.tasks.clone()),
            (resources::SESSIONS, _) => ViewData::Sessions(state.sessions.clone()),
            (resources::MESSAGES, _) => ViewData::Messages(state.threads.clone()),
            (resources::ANALYTICS, _) => ViewData::Analytics(generate::analytics()),
            (resources::RESOURCES, _) => ViewData::Resources(generate::resources()),
            (resources::EARNINGS, _) => ViewData::Earnings(generate::earnings()),
            (other, _) => return Err(SourceError::UnknownResource(other.to_string())),
        };
        Ok(data)
    }

    async fn execute(
        &self,
        operation: &str,
        payload: serde_json::Value,
    ) -> Result<ViewData, SourceError> {
        let latency = match operation {
            operations::UPDATE_TASK_STATUS | operations::CREATE_SESSION => base_latency(operation),
            _ => None,
        }
        .ok_or_else(|| SourceError::UnknownOperation(operation.to_string()))?;

        debug!(operation = %operation, "simulated operation");
        self.enter(operation, latency).await?;

        match operation {
            operations::UPDATE_TASK_STATUS => {
                let change: TaskStatusChange = decode(operation, payload)?;
                let update = self.state.write().update_task_status(&change)?;
                Ok(ViewData::TaskStatusUpdated(update))
            }
            operations::CREATE_SESSION => {
                let request: NewSession = decode(operation, payload)?;
                let session = self.state.write().create_session(request)?;
                Ok(ViewData::SessionCreated(session))
            }
            other => Err(SourceError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;
    use crate::view::keys;
    use serde_json::json;

    fn source() -> MockDataSource {
        MockDataSource::with_seed(42).with_latency_scale(0.0)
    }

    #[test]
    fn latency_table_covers_every_resource() {
        for resource in resources::ALL {
            assert!(base_latency(resource).is_some(), "{resource}");
        }
        assert_eq!(base_latency("nope"), None);
    }

    #[test]
    fn negative_scale_clamps_to_zero() {
        assert!(MockDataSource::with_seed(1).with_latency_scale(-3.0).latency_scale().abs() < f64::EPSILON);
    }

    #[test]
    fn huge_scale_is_capped() {
        let source = MockDataSource::with_seed(1).with_latency_scale(1e300);
        assert!((source.latency_scale() - MAX_LATENCY_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn scaled_delay_saturates() {
        let second = Duration::from_secs(1);
        assert_eq!(scaled(second, 0.5), Duration::from_millis(500));
        assert_eq!(scaled(second, 1e300), Duration::MAX);
        assert_eq!(scaled(second, f64::NAN), Duration::MAX);
        assert_eq!(scaled(second, -1.0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn largest_scale_still_fetches() {
        let source = MockDataSource::with_seed(1).with_latency_scale(1e300);
        let tasks = source.fetch(&keys::tasks()).await.unwrap();
        assert_eq!(tasks.into_tasks().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn fetch_counts_fixed_sizes() {
        let source = source();
        let mentees = source.fetch(&keys::mentees()).await.unwrap();
        assert_eq!(mentees.as_mentees().map(Vec::len), Some(6));
        let tasks = source.fetch(&keys::tasks()).await.unwrap();
        assert_eq!(tasks.as_tasks().map(Vec::len), Some(12));
        let sessions = source.fetch(&keys::sessions()).await.unwrap();
        assert_eq!(sessions.as_sessions().map(Vec::len), Some(3));
        let resources = source.fetch(&keys::resources()).await.unwrap();
        assert_eq!(resources.as_resources().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn thread_requires_id() {
        let err = source()
            .fetch(&QueryKey::new(resources::THREAD))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let err = source().fetch(&keys::thread("thread-99")).await.unwrap_err();
        assert_eq!(err, SourceError::NotFound("thread thread-99".to_string()));
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected_without_a_call() {
        let source = source();
        let err = source.fetch(&QueryKey::new("payroll")).await.unwrap_err();
        assert_eq!(err, SourceError::UnknownResource("payroll".to_string()));
        assert_eq!(source.call_count("payroll"), 0);
    }

    #[tokio::test]
    async fn status_update_is_applied() {
        let source = source();
        let response = source
            .execute(
                operations::UPDATE_TASK_STATUS,
                json!({ "taskId": "task-3", "status": "done" }),
            )
            .await
            .unwrap();
        let update = response.into_task_status_update().unwrap();
        assert!(update.success);
        let task = source.tasks().into_iter().find(|t| t.id == "task-3").unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let err = source()
            .execute(operations::UPDATE_TASK_STATUS, json!({ "taskId": "task-1", "status": "archived" }))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn injected_fault_is_consumed() {
        let source = source();
        source.fail_next(resources::EARNINGS, 1);
        assert!(source.fetch(&keys::earnings()).await.is_err());
        assert!(source.fetch(&keys::earnings()).await.is_ok());
        assert_eq!(source.call_count(resources::EARNINGS), 2);
    }
}
