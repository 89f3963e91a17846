//! View data model
//!
//! Record types served to the dashboard pages, serialized with the camelCase
//! field names the frontend API uses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error parsing an enum from its wire name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Mentoring pathway of a mentee
pub const PATHWAYS: [&str; 3] = ["PLAB Preparation", "NHS Job Ready", "Postgraduate Training"];

/// Risk level of a mentee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Task or flag priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// GapMap milestone stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapMapStage {
    Planning,
    #[serde(rename = "In Progress")]
    InProgress,
    Review,
    Complete,
}

/// A mentee on the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mentee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub pathway: String,
    pub trust: String,
    pub specialty: String,
    pub visa_status: String,
    pub exam_date: DateTime<Utc>,
    pub cv_readiness: u8,
    pub interview_sim_band: u8,
    pub sponsor_match_shortlist: u8,
    pub gap_map_stage: GapMapStage,
    pub risk_level: RiskLevel,
    pub last_activity: DateTime<Utc>,
    pub notes: Vec<String>,
}

/// Product a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "CVPro™")]
    CvPro,
    #[serde(rename = "InterviewSim+™")]
    InterviewSim,
    #[serde(rename = "SponsorMatch™")]
    SponsorMatch,
    #[serde(rename = "GapMap™")]
    GapMap,
    General,
}

impl TaskType {
    /// All task types, in board tab order
    pub const ALL: [TaskType; 5] = [
        TaskType::CvPro,
        TaskType::InterviewSim,
        TaskType::SponsorMatch,
        TaskType::GapMap,
        TaskType::General,
    ];

    /// Display name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CvPro => "CVPro™",
            Self::InterviewSim => "InterviewSim+™",
            Self::SponsorMatch => "SponsorMatch™",
            Self::GapMap => "GapMap™",
            Self::General => "General",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        match lowered.trim_end_matches('™') {
            "cvpro" => Ok(Self::CvPro),
            "interviewsim+" | "interviewsim" => Ok(Self::InterviewSim),
            "sponsormatch" => Ok(Self::SponsorMatch),
            "gapmap" => Ok(Self::GapMap),
            "general" => Ok(Self::General),
            _ => Err(ParseEnumError {
                kind: "task type",
                value: s.to_string(),
            }),
        }
    }
}

/// Kanban column of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    New,
    InProgress,
    WaitingMentee,
    Done,
}

impl TaskStatus {
    /// All statuses, in column order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::WaitingMentee,
        TaskStatus::Done,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in-progress",
            Self::WaitingMentee => "waiting-mentee",
            Self::Done => "done",
        }
    }

    /// Column title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::WaitingMentee => "Waiting on Mentee",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "task status",
                value: s.to_string(),
            })
    }
}

/// One checklist line of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// A mentoring task on the kanban board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
    pub mentee_id: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub checklist: Vec<ChecklistItem>,
}

/// Kind of a mentoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "CV Clinic")]
    CvClinic,
    #[serde(rename = "Interview Drill")]
    InterviewDrill,
    #[serde(rename = "Career Consult")]
    CareerConsult,
    #[serde(rename = "GapMap Review")]
    GapMapReview,
}

impl SessionType {
    /// Display name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CvClinic => "CV Clinic",
            Self::InterviewDrill => "Interview Drill",
            Self::CareerConsult => "Career Consult",
            Self::GapMapReview => "GapMap Review",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// A scheduled mentoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SessionType,
    pub mentee_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub google_meet_link: String,
    pub objectives: String,
    pub status: SessionStatus,
}

/// Input of the `create_session` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(rename = "type")]
    pub kind: SessionType,
    pub mentee_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub objectives: String,
}

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Mentor,
    Mentee,
}

/// One message in a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub sender_type: SenderType,
}

/// Inbox row: a thread with its latest message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageThread {
    pub id: String,
    pub mentee_id: String,
    pub last_message: Message,
    pub unread_count: u32,
}

/// Full conversation of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub messages: Vec<Message>,
}

/// Cohort-wide KPIs, percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortKpis {
    pub avg_cv_readiness: u8,
    pub avg_interview_improvement: u8,
    pub gap_map_on_track: u8,
    pub sponsor_match_cleared: u8,
}

/// Six-month trend lines for one mentee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualMetrics {
    pub mentee_id: String,
    pub cv_readiness_trend: Vec<u8>,
    pub interview_band_trend: Vec<u8>,
    pub gap_map_progress: Vec<GapMapStage>,
}

/// Analytics page data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub cohort_kpis: CohortKpis,
    pub individual_metrics: Vec<IndividualMetrics>,
}

/// Kind of library resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Template,
    Guide,
    Data,
}

/// A library resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

/// Source of an earning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EarningKind {
    Session,
    Instagram,
}

/// Payout state of an earning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    Paid,
    Pending,
}

/// Next scheduled payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub amount: f64,
    pub date: NaiveDate,
}

/// Headline earnings figures, GBP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub this_month: f64,
    pub next_payout: Payout,
    pub lifetime: f64,
}

/// One line of earnings history, GBP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EarningKind,
    pub session_type: String,
    pub mentor_fee: f64,
    pub platform_fee: f64,
    pub processing_fee: f64,
    pub net_amount: f64,
    pub status: PayoutStatus,
    pub payout_date: Option<NaiveDate>,
}

/// Monthly earnings split by source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub sessions: u32,
    pub instagram: u32,
}

/// Earnings page data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earnings {
    pub summary: EarningsSummary,
    pub history: Vec<EarningRecord>,
    pub trend: Vec<MonthlyTrend>,
}

/// Open tasks per product queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub cvpro_reviews: usize,
    pub interviewsim_feedback: usize,
    pub sponsormatch_reviews: usize,
    pub gapmap_checkpoints: usize,
    pub general_tasks: usize,
}

impl QueueCounts {
    /// Count open (not done) tasks per product
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut counts = Self::default();
        for task in tasks.iter().filter(|t| t.status != TaskStatus::Done) {
            match task.kind {
                TaskType::CvPro => counts.cvpro_reviews += 1,
                TaskType::InterviewSim => counts.interviewsim_feedback += 1,
                TaskType::SponsorMatch => counts.sponsormatch_reviews += 1,
                TaskType::GapMap => counts.gapmap_checkpoints += 1,
                TaskType::General => counts.general_tasks += 1,
            }
        }
        counts
    }

    /// Total open tasks
    #[must_use]
    pub fn total(&self) -> usize {
        self.cvpro_reviews
            + self.interviewsim_feedback
            + self.sponsormatch_reviews
            + self.gapmap_checkpoints
            + self.general_tasks
    }
}

/// Overview page data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub todays_sessions: Vec<Session>,
    pub queue_counts: QueueCounts,
    pub unread_messages: Vec<MessageThread>,
    pub at_risk_mentees: Vec<Mentee>,
}

/// Input of the `update_task_status` operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusChange {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Acknowledgement of a task status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    pub success: bool,
    pub task_id: String,
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_wire_names() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("finished".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn task_type_parses_loosely() {
        assert_eq!("CVPro™".parse::<TaskType>(), Ok(TaskType::CvPro));
        assert_eq!("interviewsim".parse::<TaskType>(), Ok(TaskType::InterviewSim));
        assert_eq!("General".parse::<TaskType>(), Ok(TaskType::General));
        let err = "Radiology".parse::<TaskType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid task type: 'Radiology'");
    }

    #[test]
    fn task_type_serializes_product_names() {
        let json = serde_json::to_string(&TaskType::SponsorMatch).unwrap();
        assert_eq!(json, "\"SponsorMatch™\"");
    }

    #[test]
    fn gap_map_stage_serializes_with_space() {
        let json = serde_json::to_string(&GapMapStage::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn new_session_decodes_camel_case() {
        let session: NewSession = serde_json::from_value(serde_json::json!({
            "type": "CV Clinic",
            "menteeIds": ["mentee-1"],
            "startTime": "2025-10-01T10:00:00Z",
            "endTime": "2025-10-01T11:00:00Z"
        }))
        .unwrap();
        assert_eq!(session.kind, SessionType::CvClinic);
        assert!(session.objectives.is_empty());
    }
}
