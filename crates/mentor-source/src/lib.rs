//! Mentor Source
//!
//! View data model of the mentor dashboard and [`MockDataSource`], the
//! simulated backend the query cache reads through.
//!
//! Every resource is addressed by a [`QueryKey`](mentor_query::QueryKey)
//! built from [`keys`]; every value is a [`ViewData`] variant. Write payloads
//! arrive as JSON and are decoded into typed requests at this boundary.

#![warn(unreachable_pub)]
#![allow(missing_docs)] // record fields mirror the API schema

pub mod generate;
pub mod mock;
pub mod model;
pub mod view;

pub use mock::{base_latency, MockDataSource, MAX_LATENCY_SCALE};
pub use model::{
    Analytics, ChecklistItem, CohortKpis, EarningKind, EarningRecord, Earnings, EarningsSummary,
    GapMapStage, IndividualMetrics, Mentee, Message, MessageThread, MonthlyTrend, NewSession,
    Overview, ParseEnumError, Payout, PayoutStatus, Priority, QueueCounts, Resource, ResourceKind,
    RiskLevel, SenderType, Session, SessionStatus, SessionType, Task, TaskStatus,
    TaskStatusChange, TaskStatusUpdate, TaskType, Thread,
};
pub use view::{keys, operations, resources, ViewData};
