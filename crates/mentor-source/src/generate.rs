//! Seeded generators for simulated records
//!
//! Randomized records (mentees, tasks, thread messages) are drawn from a
//! [`StdRng`] so a seed reproduces the same roster. Fixed records
//! (sessions, inbox, analytics, library, earnings) are plain builders.

use crate::model::{
    Analytics, ChecklistItem, CohortKpis, EarningKind, EarningRecord, Earnings, EarningsSummary,
    GapMapStage, IndividualMetrics, Mentee, Message, MessageThread, MonthlyTrend, Payout,
    PayoutStatus, Priority, Resource, ResourceKind, RiskLevel, SenderType, Session, SessionStatus,
    SessionType, Task, TaskStatus, TaskType, Thread, PATHWAYS,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

const FIRST_NAMES: [&str; 12] = [
    "Aisha", "Rohan", "Priya", "Tunde", "Fatima", "Omar", "Chloe", "Kwame", "Mei", "Daniel",
    "Zara", "Imran",
];

const LAST_NAMES: [&str; 10] = [
    "Okafor", "Sharma", "Patel", "Adeyemi", "Khan", "Hassan", "Evans", "Mensah", "Chen",
    "Rahman",
];

const TRUSTS: [&str; 8] = [
    "Guy's and St Thomas'",
    "Manchester University",
    "Leeds Teaching Hospitals",
    "Barts Health",
    "Oxford University Hospitals",
    "Royal Free London",
    "Sheffield Teaching Hospitals",
    "University Hospitals Birmingham",
];

const SPECIALTIES: [&str; 5] = [
    "Internal Medicine",
    "Surgery",
    "Emergency Medicine",
    "Psychiatry",
    "Paediatrics",
];

const VISA_STATUSES: [&str; 3] = ["Tier 2", "Graduate", "Settled"];

const MENTEE_NOTES: [&str; 6] = [
    "Strong clinical background, needs NHS context",
    "Interview nerves, practise STAR answers",
    "CV lacks audit and QI evidence",
    "Waiting on sponsorship letter",
    "Great progress on communication skills",
    "Needs help with portfolio structure",
];

const TASK_TITLES: [&str; 10] = [
    "Review CV draft",
    "Give mock interview feedback",
    "Check sponsorship shortlist",
    "GapMap checkpoint review",
    "Prepare portfolio guidance",
    "Review personal statement",
    "Assess clinical scenario answers",
    "Update NHS application tracker",
    "Review reference requests",
    "Plan next mentoring session",
];

const TASK_DESCRIPTIONS: [&str; 5] = [
    "Go through the latest submission and leave actionable comments.",
    "Focus on structure, NHS terminology and measurable outcomes.",
    "Compare against the last checkpoint and flag regressions.",
    "Agree next steps with the mentee and record them.",
    "Highlight the three most important improvements.",
];

const CHECKLIST_TEXTS: [&str; 8] = [
    "Read submission",
    "Leave inline comments",
    "Score against rubric",
    "Record summary notes",
    "Send feedback email",
    "Book follow-up",
    "Update tracker",
    "Attach resources",
];

const MESSAGE_TEXTS: [&str; 8] = [
    "Thanks for the feedback on my CV!",
    "Could we move our session to Thursday?",
    "I've uploaded the revised personal statement.",
    "Do you have any tips for the clinical scenario station?",
    "Great work this week, keep going.",
    "Please review the template I shared before Friday.",
    "I passed my PLAB 1!",
    "Let's focus on the sponsorship shortlist next time.",
];

/// Number of mentees on the simulated roster
pub const MENTEE_COUNT: usize = 6;

/// Number of tasks on the simulated board
pub const TASK_COUNT: usize = 12;

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn pick_copy<T: Copy>(rng: &mut StdRng, items: &[T], fallback: T) -> T {
    items.choose(rng).copied().unwrap_or(fallback)
}

fn uuid_from(rng: &mut StdRng) -> String {
    uuid::Builder::from_random_bytes(rng.random())
        .into_uuid()
        .to_string()
}

/// Seed for per-id generation, stable across runs
#[must_use]
pub fn seed_for(base: u64, id: &str) -> u64 {
    id.bytes()
        .fold(base ^ 0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

/// Build the mentee roster
pub fn mentees(rng: &mut StdRng, now: DateTime<Utc>) -> Vec<Mentee> {
    (1..=MENTEE_COUNT)
        .map(|i| {
            let first = pick(rng, &FIRST_NAMES);
            let last = pick(rng, &LAST_NAMES);
            let note_count = rng.random_range(1..=3);
            Mentee {
                id: format!("mentee-{i}"),
                name: format!("Dr. {first} {last}"),
                email: format!(
                    "{}.{}@example.nhs.uk",
                    first.to_lowercase(),
                    last.to_lowercase()
                ),
                avatar: format!("https://i.pravatar.cc/150?u=mentee-{i}"),
                pathway: pick(rng, &PATHWAYS).to_string(),
                trust: pick(rng, &TRUSTS).to_string(),
                specialty: pick(rng, &SPECIALTIES).to_string(),
                visa_status: pick(rng, &VISA_STATUSES).to_string(),
                exam_date: now + Duration::days(rng.random_range(14..=365)),
                cv_readiness: rng.random_range(45..=95),
                interview_sim_band: rng.random_range(3..=8),
                sponsor_match_shortlist: rng.random_range(0..=10),
                gap_map_stage: pick_copy(
                    rng,
                    &[
                        GapMapStage::Planning,
                        GapMapStage::InProgress,
                        GapMapStage::Review,
                        GapMapStage::Complete,
                    ],
                    GapMapStage::Planning,
                ),
                risk_level: pick_copy(
                    rng,
                    &[RiskLevel::Low, RiskLevel::Medium, RiskLevel::High],
                    RiskLevel::Low,
                ),
                last_activity: now - Duration::hours(rng.random_range(1..=7 * 24)),
                notes: (0..note_count)
                    .map(|_| pick(rng, &MENTEE_NOTES).to_string())
                    .collect(),
            }
        })
        .collect()
}

/// Build the task board
pub fn tasks(rng: &mut StdRng, now: DateTime<Utc>) -> Vec<Task> {
    (1..=TASK_COUNT)
        .map(|i| {
            let checklist_len = rng.random_range(2..=5);
            let checklist = (0..checklist_len)
                .map(|_| ChecklistItem {
                    id: uuid_from(rng),
                    text: pick(rng, &CHECKLIST_TEXTS).to_string(),
                    completed: rng.random_bool(0.5),
                })
                .collect();
            Task {
                id: format!("task-{i}"),
                title: pick(rng, &TASK_TITLES).to_string(),
                kind: pick_copy(rng, &TaskType::ALL, TaskType::General),
                mentee_id: format!("mentee-{}", rng.random_range(1..=MENTEE_COUNT)),
                priority: pick_copy(
                    rng,
                    &[Priority::Low, Priority::Medium, Priority::High],
                    Priority::Medium,
                ),
                status: pick_copy(rng, &TaskStatus::ALL, TaskStatus::New),
                due_date: now + Duration::days(rng.random_range(1..=30)),
                created_at: now - Duration::days(rng.random_range(1..=30)),
                description: pick(rng, &TASK_DESCRIPTIONS).to_string(),
                checklist,
            }
        })
        .collect()
}

fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    day.and_hms_opt(hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_default()
}

/// Build the session calendar: two sessions today, one tomorrow
pub fn sessions(today: NaiveDate) -> Vec<Session> {
    let tomorrow = today.succ_opt().unwrap_or(today);
    vec![
        Session {
            id: "session-1".to_string(),
            kind: SessionType::CvClinic,
            mentee_ids: vec!["mentee-1".to_string(), "mentee-2".to_string()],
            start_time: at(today, 10),
            end_time: at(today, 11),
            google_meet_link: "https://meet.google.com/abc-defg-hij".to_string(),
            objectives: "Review CV structure and NHS-specific formatting".to_string(),
            status: SessionStatus::Scheduled,
        },
        Session {
            id: "session-2".to_string(),
            kind: SessionType::InterviewDrill,
            mentee_ids: vec!["mentee-3".to_string()],
            start_time: at(today, 14),
            end_time: at(today, 15),
            google_meet_link: "https://meet.google.com/xyz-uvwx-rst".to_string(),
            objectives: "Practice clinical scenarios and communication skills".to_string(),
            status: SessionStatus::Scheduled,
        },
        Session {
            id: "session-3".to_string(),
            kind: SessionType::GapMapReview,
            mentee_ids: vec!["mentee-4".to_string(), "mentee-5".to_string()],
            start_time: at(tomorrow, 9),
            end_time: at(tomorrow, 10),
            google_meet_link: "https://meet.google.com/lmn-opqr-stu".to_string(),
            objectives: "Review progress on GapMap milestones".to_string(),
            status: SessionStatus::Scheduled,
        },
    ]
}

/// Build the inbox: one thread for each of the first four mentees
pub fn threads(now: DateTime<Utc>) -> Vec<MessageThread> {
    let latest = [
        ("Thanks for the feedback on my CV!", 2, SenderType::Mentee),
        ("Could we move our session to Thursday?", 5, SenderType::Mentee),
        ("Please review the template I shared before Friday.", 26, SenderType::Mentor),
        ("I passed my PLAB 1!", 50, SenderType::Mentee),
    ];
    let unread = [2, 1, 0, 3];

    latest
        .iter()
        .zip(unread)
        .enumerate()
        .map(|(i, ((content, hours_ago, sender_type), unread_count))| {
            let n = i + 1;
            let mentee_id = format!("mentee-{n}");
            let sender_id = match sender_type {
                SenderType::Mentee => mentee_id.clone(),
                SenderType::Mentor => "mentor-1".to_string(),
            };
            MessageThread {
                id: format!("thread-{n}"),
                mentee_id,
                last_message: Message {
                    id: format!("msg-{n}"),
                    content: (*content).to_string(),
                    timestamp: now - Duration::hours(*hours_ago),
                    sender_id,
                    sender_type: *sender_type,
                },
                unread_count,
            }
        })
        .collect()
}

/// Build a conversation of 3 to 10 messages for `thread`
pub fn thread_messages(rng: &mut StdRng, thread: &MessageThread) -> Thread {
    let count = rng.random_range(3..=10);
    let mut timestamp = thread.last_message.timestamp - Duration::hours(count * 6);
    let mut messages: Vec<Message> = (0..count)
        .map(|i| {
            timestamp += Duration::hours(rng.random_range(1..=6));
            let sender_type = if rng.random_bool(0.5) {
                SenderType::Mentor
            } else {
                SenderType::Mentee
            };
            Message {
                id: format!("{}-msg-{}", thread.id, i + 1),
                content: pick(rng, &MESSAGE_TEXTS).to_string(),
                timestamp,
                sender_id: match sender_type {
                    SenderType::Mentor => "mentor-1".to_string(),
                    SenderType::Mentee => thread.mentee_id.clone(),
                },
                sender_type,
            }
        })
        .collect();

    // Conversation ends with the inbox preview
    if let Some(last) = messages.last_mut() {
        *last = thread.last_message.clone();
    }

    Thread {
        id: thread.id.clone(),
        messages,
    }
}

/// Build the analytics page
pub fn analytics() -> Analytics {
    use GapMapStage::{Complete, InProgress, Planning, Review};

    Analytics {
        cohort_kpis: CohortKpis {
            avg_cv_readiness: 72,
            avg_interview_improvement: 18,
            gap_map_on_track: 67,
            sponsor_match_cleared: 42,
        },
        individual_metrics: vec![
            IndividualMetrics {
                mentee_id: "mentee-1".to_string(),
                cv_readiness_trend: vec![45, 52, 58, 65, 72, 78],
                interview_band_trend: vec![4, 5, 5, 6, 6, 7],
                gap_map_progress: vec![Planning, Planning, InProgress, InProgress, Review, Review],
            },
            IndividualMetrics {
                mentee_id: "mentee-2".to_string(),
                cv_readiness_trend: vec![60, 62, 70, 74, 80, 85],
                interview_band_trend: vec![5, 5, 6, 7, 7, 8],
                gap_map_progress: vec![InProgress, InProgress, Review, Review, Complete, Complete],
            },
        ],
    }
}

/// Build the resource library
pub fn resources() -> Vec<Resource> {
    let resource = |id: &str, title: &str, description: &str, tags: &[&str], url: &str, kind| {
        Resource {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            url: url.to_string(),
            kind,
        }
    };

    vec![
        resource(
            "resource-1",
            "NHS CV Template",
            "Standard CV template optimized for NHS applications",
            &["CV", "Template", "NHS"],
            "/resources/nhs-cv-template.docx",
            ResourceKind::Template,
        ),
        resource(
            "resource-2",
            "Interview Preparation Guide",
            "Comprehensive guide covering common NHS interview questions",
            &["Interview", "Guide", "Preparation"],
            "/resources/interview-guide.pdf",
            ResourceKind::Guide,
        ),
        resource(
            "resource-3",
            "Visa Sponsorship Employers",
            "Employers with a track record of Tier 2 sponsorship",
            &["Visa", "Sponsorship", "Data"],
            "/resources/sponsorship-employers.xlsx",
            ResourceKind::Data,
        ),
        resource(
            "resource-4",
            "Clinical Scenario Bank",
            "Practice scenarios for clinical interview stations",
            &["Interview", "Clinical", "Practice"],
            "/resources/clinical-scenarios.pdf",
            ResourceKind::Guide,
        ),
        resource(
            "resource-5",
            "Portfolio Checklist",
            "Checklist of evidence for specialty training portfolios",
            &["Portfolio", "Template", "Training"],
            "/resources/portfolio-checklist.docx",
            ResourceKind::Template,
        ),
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Build the earnings page
pub fn earnings() -> Earnings {
    let trend = [
        ("Jul", 1850, 350),
        ("Aug", 2100, 400),
        ("Sep", 2340, 450),
        ("Oct", 2680, 520),
        ("Nov", 2920, 580),
        ("Dec", 3150, 650),
    ];

    Earnings {
        summary: EarningsSummary {
            this_month: 2_450.00,
            next_payout: Payout {
                amount: 1_890.00,
                date: date(2024, 2, 1),
            },
            lifetime: 18_750.00,
        },
        history: vec![
            EarningRecord {
                id: "earning-1".to_string(),
                date: date(2024, 1, 15),
                kind: EarningKind::Session,
                session_type: "CV Clinic".to_string(),
                mentor_fee: 150.00,
                platform_fee: 22.50,
                processing_fee: 4.35,
                net_amount: 123.15,
                status: PayoutStatus::Paid,
                payout_date: Some(date(2024, 1, 20)),
            },
            EarningRecord {
                id: "earning-2".to_string(),
                date: date(2024, 1, 16),
                kind: EarningKind::Session,
                session_type: "Interview Drill".to_string(),
                mentor_fee: 200.00,
                platform_fee: 30.00,
                processing_fee: 5.80,
                net_amount: 164.20,
                status: PayoutStatus::Pending,
                payout_date: None,
            },
            EarningRecord {
                id: "earning-3".to_string(),
                date: date(2024, 1, 18),
                kind: EarningKind::Instagram,
                session_type: "Sponsored Post".to_string(),
                mentor_fee: 300.00,
                platform_fee: 45.00,
                processing_fee: 8.70,
                net_amount: 246.30,
                status: PayoutStatus::Pending,
                payout_date: None,
            },
        ],
        trend: trend
            .iter()
            .map(|(month, sessions, instagram)| MonthlyTrend {
                month: (*month).to_string(),
                sessions: *sessions,
                instagram: *instagram,
            })
            .collect(),
    }
}
