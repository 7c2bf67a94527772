//! Task model for time tracking.
//!
//! A task moves through a small state machine (see [`lifecycle`]) and keeps
//! its committed work time in [`TimeTracking`]. The live elapsed value for a
//! running task is never stored; [`timer`] derives it from the snapshot.
//!
//! ```text
//!   PENDING ──start──> IN_PROGRESS ──complete──> COMPLETED
//!                        │     ^
//!                  pause │     │ resume / start
//!                        v     │
//!                        PAUSED ──complete──> COMPLETED
//!
//!   any non-terminal ──cancel──> CANCELLED
//! ```

pub mod backend;
pub mod carry_over;
pub mod lifecycle;
pub mod timer;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use backend::{LocalTaskBackend, TaskBackend};
pub use lifecycle::TaskBoard;

/// Task status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, never started
    #[default]
    Pending,
    /// Timer running
    InProgress,
    /// Timer stopped, task resumable
    Paused,
    /// Terminal
    Completed,
    /// Terminal
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "paused" => Some(TaskStatus::Paused),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// User-facing operation on a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Start,
    Pause,
    Resume,
    Complete,
    Cancel,
    Edit,
    /// Manual correction of the running session
    Adjust,
    Delete,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskAction::Start => "start",
            TaskAction::Pause => "pause",
            TaskAction::Resume => "resume",
            TaskAction::Complete => "complete",
            TaskAction::Cancel => "cancel",
            TaskAction::Edit => "edit",
            TaskAction::Adjust => "adjust",
            TaskAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// One entry of the append-only title/description log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How a work session was closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Closed by a pause
    Pause,
    /// Closed by completing the task
    Stop,
}

/// A closed InProgress interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whole seconds of work credited for this session
    pub duration: u64,
    pub session_type: SessionType,
}

/// Committed work time plus the bookkeeping for the running session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimeTracking {
    /// Sum of all closed sessions. Excludes the running session.
    pub total_seconds: u64,
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Set while InProgress
    #[serde(default)]
    pub current_session_start: Option<DateTime<Utc>>,
    /// `total_seconds` captured when the running session began
    #[serde(default)]
    pub base_total_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    /// Owner the single-InProgress invariant is scoped to
    pub owner: String,
    pub status: TaskStatus,
    /// Never empty; the last entry is the current title/description
    pub history: Vec<HistoryEntry>,
    /// First transition into InProgress
    pub start_time: Option<DateTime<Utc>>,
    pub pause_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds to discount from the running session (manual corrections)
    #[serde(default)]
    pub paused_for_in_seconds: u64,
    #[serde(default)]
    pub time_tracking: TimeTracking,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_carried_forward: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        owner: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            status: TaskStatus::Pending,
            history: vec![HistoryEntry {
                title: title.into(),
                description,
                created_at: now,
            }],
            start_time: None,
            pause_time: None,
            stop_time: None,
            completed_at: None,
            paused_for_in_seconds: 0,
            time_tracking: TimeTracking::default(),
            priority: Priority::Medium,
            tags: Vec::new(),
            due_date: None,
            is_carried_forward: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn title(&self) -> &str {
        self.history.last().map(|h| h.title.as_str()).unwrap_or("")
    }

    pub fn description(&self) -> Option<&str> {
        self.history.last().and_then(|h| h.description.as_deref())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Committed plus live elapsed seconds at `now`.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        timer::current_elapsed_seconds(self, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_task_is_pending_with_one_history_entry() {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let task = Task::new("alice", "Write report", Some("Q1".into()), now);

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.title(), "Write report");
        assert_eq!(task.description(), Some("Q1"));
        assert_eq!(task.time_tracking.total_seconds, 0);
        assert!(task.start_time.is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Paused.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Paused,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("running"), None);
    }

    #[test]
    fn serializes_status_in_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
