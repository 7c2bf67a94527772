use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Every task and attendance state change produces an Event.
/// Front ends print or forward them; the core never consumes its own events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TaskCreated {
        task_id: String,
        title: String,
        at: DateTime<Utc>,
    },
    TaskStarted {
        task_id: String,
        /// True when this was the task's first ever start
        first_start: bool,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    TaskPaused {
        task_id: String,
        session_seconds: u64,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    TaskResumed {
        task_id: String,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        from: TaskStatus,
        total_seconds: u64,
        session_count: usize,
        at: DateTime<Utc>,
    },
    TaskCancelled {
        task_id: String,
        from: TaskStatus,
        at: DateTime<Utc>,
    },
    TaskEdited {
        task_id: String,
        title: String,
        revision: usize,
        at: DateTime<Utc>,
    },
    /// Manual correction to the running session.
    TaskAdjusted {
        task_id: String,
        paused_for_in_seconds: u64,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: String,
        at: DateTime<Utc>,
    },
    CheckedIn {
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    CheckedOut {
        date: NaiveDate,
        working_seconds: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TaskCreated { at, .. }
            | Event::TaskStarted { at, .. }
            | Event::TaskPaused { at, .. }
            | Event::TaskResumed { at, .. }
            | Event::TaskCompleted { at, .. }
            | Event::TaskCancelled { at, .. }
            | Event::TaskEdited { at, .. }
            | Event::TaskAdjusted { at, .. }
            | Event::TaskDeleted { at, .. }
            | Event::CheckedIn { at, .. }
            | Event::CheckedOut { at, .. } => *at,
        }
    }
}
