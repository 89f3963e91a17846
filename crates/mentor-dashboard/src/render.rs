//! Plain-text rendering for the CLI

use crate::dashboard::TaskBoard;
use mentor_query::QueryStatus;
use mentor_source::{Earnings, Mentee, Overview, Session, Thread};
use std::fmt::Write;

/// Overview page as text
#[must_use]
pub fn overview(overview: &Overview) -> String {
    let mut out = String::new();
    let q = &overview.queue_counts;
    let _ = writeln!(out, "Today's sessions: {}", overview.todays_sessions.len());
    for session in &overview.todays_sessions {
        let _ = writeln!(out, "  {}", session_line(session));
    }
    let _ = writeln!(out, "Open queues ({} total):", q.total());
    let _ = writeln!(out, "  CVPro reviews         {}", q.cvpro_reviews);
    let _ = writeln!(out, "  InterviewSim feedback {}", q.interviewsim_feedback);
    let _ = writeln!(out, "  SponsorMatch reviews  {}", q.sponsormatch_reviews);
    let _ = writeln!(out, "  GapMap checkpoints    {}", q.gapmap_checkpoints);
    let _ = writeln!(out, "  General tasks         {}", q.general_tasks);
    let _ = writeln!(out, "Unread threads: {}", overview.unread_messages.len());
    for thread in &overview.unread_messages {
        let _ = writeln!(
            out,
            "  {} ({} unread): {}",
            thread.id, thread.unread_count, thread.last_message.content
        );
    }
    let _ = writeln!(out, "At-risk mentees: {}", overview.at_risk_mentees.len());
    for mentee in &overview.at_risk_mentees {
        let _ = writeln!(out, "  {} {}", mentee.id, mentee.name);
    }
    out
}

/// Mentee roster as a table
#[must_use]
pub fn mentees(mentees: &[Mentee]) -> String {
    let mut out = String::new();
    for m in mentees {
        let _ = writeln!(
            out,
            "{:<10} {:<26} {:<22} CV {:>3}%  band {}  risk {:?}",
            m.id, m.name, m.pathway, m.cv_readiness, m.interview_sim_band, m.risk_level
        );
    }
    out
}

/// Kanban board, one block per column
#[must_use]
pub fn board(board: &TaskBoard) -> String {
    let mut out = String::new();
    for column in &board.columns {
        let _ = writeln!(out, "{} ({})", column.status.title(), column.tasks.len());
        for task in &column.tasks {
            let _ = writeln!(
                out,
                "  {:<8} {:<16} {:<34} {}",
                task.id,
                task.kind.as_str(),
                task.title,
                task.mentee_id
            );
        }
    }
    out
}

fn session_line(session: &Session) -> String {
    format!(
        "{} {}-{} {} [{}]",
        session.id,
        session.start_time.format("%Y-%m-%d %H:%M"),
        session.end_time.format("%H:%M"),
        session.kind,
        session.mentee_ids.join(", ")
    )
}

/// Session calendar
#[must_use]
pub fn sessions(sessions: &[Session]) -> String {
    sessions.iter().fold(String::new(), |mut out, s| {
        let _ = writeln!(out, "{}", session_line(s));
        out
    })
}

/// One conversation
#[must_use]
pub fn thread(thread: &Thread) -> String {
    let mut out = format!("{}\n", thread.id);
    for message in &thread.messages {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.sender_id,
            message.content
        );
    }
    out
}

/// Earnings summary and history
#[must_use]
pub fn earnings(earnings: &Earnings) -> String {
    let s = &earnings.summary;
    let mut out = String::new();
    let _ = writeln!(out, "This month: £{:.2}", s.this_month);
    let _ = writeln!(
        out,
        "Next payout: £{:.2} on {}",
        s.next_payout.amount, s.next_payout.date
    );
    let _ = writeln!(out, "Lifetime: £{:.2}", s.lifetime);
    for record in &earnings.history {
        let _ = writeln!(
            out,
            "  {} {:<16} net £{:>7.2} {:?}",
            record.date, record.session_type, record.net_amount, record.status
        );
    }
    out
}

/// Short label of an entry state
#[must_use]
pub fn status_label(status: QueryStatus, is_fetching: bool, is_stale: bool) -> String {
    let mut label = format!("{status:?}").to_lowercase();
    if is_fetching {
        label.push_str(" (fetching)");
    } else if is_stale {
        label.push_str(" (stale)");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::TaskFilter;
    use mentor_source::QueueCounts;

    #[test]
    fn empty_board_lists_every_column() {
        let text = board(&TaskBoard::build(&[], &TaskFilter::new()));
        assert!(text.contains("New (0)"));
        assert!(text.contains("Waiting on Mentee (0)"));
        assert!(text.contains("Done (0)"));
    }

    #[test]
    fn overview_totals_queues() {
        let text = overview(&Overview {
            todays_sessions: Vec::new(),
            queue_counts: QueueCounts {
                cvpro_reviews: 2,
                general_tasks: 1,
                ..QueueCounts::default()
            },
            unread_messages: Vec::new(),
            at_risk_mentees: Vec::new(),
        });
        assert!(text.contains("Open queues (3 total)"));
    }

    #[test]
    fn labels_mark_background_work() {
        assert_eq!(status_label(QueryStatus::Success, true, true), "success (fetching)");
        assert_eq!(status_label(QueryStatus::Success, false, true), "success (stale)");
        assert_eq!(status_label(QueryStatus::Error, false, false), "error");
    }
}
