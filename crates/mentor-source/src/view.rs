//! Resource names, operation names and the value type they carry

use crate::model::{
    Analytics, Earnings, Mentee, MessageThread, Overview, Resource, Session, Task,
    TaskStatusUpdate, Thread,
};
use mentor_query::QueryKey;
use serde::{Deserialize, Serialize};

/// Resource names, the first part of every query key
pub mod resources {
    /// Overview page
    pub const OVERVIEW: &str = "overview";
    /// Mentee roster
    pub const MENTEES: &str = "mentees";
    /// Task board
    pub const TASKS: &str = "tasks";
    /// Session calendar
    pub const SESSIONS: &str = "sessions";
    /// Inbox
    pub const MESSAGES: &str = "messages";
    /// One conversation, keyed `thread:<id>`
    pub const THREAD: &str = "thread";
    /// Analytics page
    pub const ANALYTICS: &str = "analytics";
    /// Resource library
    pub const RESOURCES: &str = "resources";
    /// Earnings page
    pub const EARNINGS: &str = "earnings";

    /// Every resource name
    pub const ALL: [&str; 9] = [
        OVERVIEW, MENTEES, TASKS, SESSIONS, MESSAGES, THREAD, ANALYTICS, RESOURCES, EARNINGS,
    ];
}

/// Write operation names
pub mod operations {
    /// Move a task to another column
    pub const UPDATE_TASK_STATUS: &str = "update_task_status";
    /// Schedule a session
    pub const CREATE_SESSION: &str = "create_session";
}

/// Query keys of the dashboard resources
pub mod keys {
    use super::resources;
    use mentor_query::QueryKey;

    /// `overview`
    #[must_use]
    pub fn overview() -> QueryKey {
        QueryKey::new(resources::OVERVIEW)
    }

    /// `mentees`
    #[must_use]
    pub fn mentees() -> QueryKey {
        QueryKey::new(resources::MENTEES)
    }

    /// `tasks`
    #[must_use]
    pub fn tasks() -> QueryKey {
        QueryKey::new(resources::TASKS)
    }

    /// `sessions`
    #[must_use]
    pub fn sessions() -> QueryKey {
        QueryKey::new(resources::SESSIONS)
    }

    /// `messages`
    #[must_use]
    pub fn messages() -> QueryKey {
        QueryKey::new(resources::MESSAGES)
    }

    /// `thread:<id>`
    #[must_use]
    pub fn thread(id: &str) -> QueryKey {
        QueryKey::new(resources::THREAD).with(id)
    }

    /// `analytics`
    #[must_use]
    pub fn analytics() -> QueryKey {
        QueryKey::new(resources::ANALYTICS)
    }

    /// `resources`
    #[must_use]
    pub fn resources() -> QueryKey {
        QueryKey::new(resources::RESOURCES)
    }

    /// `earnings`
    #[must_use]
    pub fn earnings() -> QueryKey {
        QueryKey::new(resources::EARNINGS)
    }
}

/// Value stored in the cache for any dashboard resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ViewData {
    /// `overview`
    Overview(Overview),
    /// `mentees`
    Mentees(Vec<Mentee>),
    /// `tasks`
    Tasks(Vec<Task>),
    /// `sessions`
    Sessions(Vec<Session>),
    /// `messages`
    Messages(Vec<MessageThread>),
    /// `thread:<id>`
    Thread(Thread),
    /// `analytics`
    Analytics(Analytics),
    /// `resources`
    Resources(Vec<Resource>),
    /// `earnings`
    Earnings(Earnings),
    /// Response of `update_task_status`
    TaskStatusUpdated(TaskStatusUpdate),
    /// Response of `create_session`
    SessionCreated(Session),
}

macro_rules! accessors {
    ($($variant:ident => $as_fn:ident, $into_fn:ident: $ty:ty;)*) => {
        impl ViewData {
            $(
                #[doc = concat!("Borrow the `", stringify!($variant), "` payload")]
                #[must_use]
                pub fn $as_fn(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[doc = concat!("Take the `", stringify!($variant), "` payload")]
                #[must_use]
                pub fn $into_fn(self) -> Option<$ty> {
                    match self {
                        Self::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            )*
        }
    };
}

accessors! {
    Overview => as_overview, into_overview: Overview;
    Mentees => as_mentees, into_mentees: Vec<Mentee>;
    Tasks => as_tasks, into_tasks: Vec<Task>;
    Sessions => as_sessions, into_sessions: Vec<Session>;
    Messages => as_messages, into_messages: Vec<MessageThread>;
    Thread => as_thread, into_thread: Thread;
    Analytics => as_analytics, into_analytics: Analytics;
    Resources => as_resources, into_resources: Vec<Resource>;
    Earnings => as_earnings, into_earnings: Earnings;
    TaskStatusUpdated => as_task_status_update, into_task_status_update: TaskStatusUpdate;
    SessionCreated => as_created_session, into_created_session: Session;
}

impl ViewData {
    /// Variant name, as serialized in `kind`
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Overview(_) => "overview",
            Self::Mentees(_) => "mentees",
            Self::Tasks(_) => "tasks",
            Self::Sessions(_) => "sessions",
            Self::Messages(_) => "messages",
            Self::Thread(_) => "thread",
            Self::Analytics(_) => "analytics",
            Self::Resources(_) => "resources",
            Self::Earnings(_) => "earnings",
            Self::TaskStatusUpdated(_) => "task_status_updated",
            Self::SessionCreated(_) => "session_created",
        }
    }

    /// Whether this value is the one `key` resolves to
    #[must_use]
    pub fn matches(&self, key: &QueryKey) -> bool {
        key.resource() == Some(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_key_carries_id() {
        let key = keys::thread("thread-3");
        assert_eq!(key.to_string(), "thread:thread-3");
        assert_eq!(key.resource(), Some(resources::THREAD));
    }

    #[test]
    fn accessors_match_variant() {
        let data = ViewData::Tasks(Vec::new());
        assert!(data.as_tasks().is_some());
        assert!(data.as_mentees().is_none());
        assert!(data.matches(&keys::tasks()));
        assert!(!data.matches(&keys::sessions()));
        assert_eq!(data.into_tasks(), Some(Vec::new()));
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let json = serde_json::to_value(ViewData::Resources(Vec::new())).unwrap();
        assert_eq!(json["kind"], "resources");
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
