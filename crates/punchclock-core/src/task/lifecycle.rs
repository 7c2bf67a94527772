//! Task state machine.
//!
//! [`transition`] applies a single action to a single task. [`TaskBoard`]
//! holds one owner's tasks and adds the cross-task rule: at most one task of
//! the owner is InProgress at any instant.
//!
//! Every operation validates before it mutates. A rejected call returns a
//! [`LifecycleError`] and leaves the task exactly as it was, so a double-tap
//! on "start" or "pause" cannot record a session twice.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use super::carry_over;
use super::{HistoryEntry, Session, SessionType, Task, TaskAction, TaskStatus};
use crate::clock::{local_date, Clock};
use crate::error::LifecycleError;
use crate::events::Event;

/// Whether `action` is legal from `status`, ignoring other tasks.
pub fn can_apply(status: TaskStatus, action: TaskAction) -> bool {
    match action {
        TaskAction::Start => matches!(status, TaskStatus::Pending | TaskStatus::Paused),
        TaskAction::Pause => status == TaskStatus::InProgress,
        TaskAction::Resume => status == TaskStatus::Paused,
        TaskAction::Complete | TaskAction::Cancel | TaskAction::Edit => !status.is_terminal(),
        TaskAction::Adjust => status == TaskStatus::InProgress,
        TaskAction::Delete => true,
    }
}

/// Actions the UI should offer for `status`.
pub fn available_actions(status: TaskStatus) -> Vec<TaskAction> {
    [
        TaskAction::Start,
        TaskAction::Pause,
        TaskAction::Resume,
        TaskAction::Complete,
        TaskAction::Cancel,
    ]
    .into_iter()
    .filter(|a| can_apply(status, *a))
    .collect()
}

fn invalid(task: &Task, action: TaskAction) -> LifecycleError {
    LifecycleError::InvalidTransition {
        task_id: task.id.clone(),
        from: task.status,
        action,
    }
}

/// Apply a state transition (start, pause, resume, complete, cancel).
///
/// Edit, adjust and delete are not status transitions; use the
/// [`TaskBoard`] methods for those.
pub fn transition(
    task: &mut Task,
    action: TaskAction,
    now: DateTime<Utc>,
) -> Result<Event, LifecycleError> {
    if !can_apply(task.status, action) {
        return Err(invalid(task, action));
    }

    let event = match action {
        TaskAction::Start if task.status == TaskStatus::Paused => {
            // Starting a paused task is a resume that keeps the original start_time.
            open_session(task, now);
            Event::TaskStarted {
                task_id: task.id.clone(),
                first_start: false,
                total_seconds: task.time_tracking.total_seconds,
                at: now,
            }
        }
        TaskAction::Start => {
            let first_start = task.start_time.is_none();
            if first_start {
                task.start_time = Some(now);
            }
            open_session(task, now);
            Event::TaskStarted {
                task_id: task.id.clone(),
                first_start,
                total_seconds: task.time_tracking.total_seconds,
                at: now,
            }
        }
        TaskAction::Pause => {
            let session_seconds = close_session(task, now, SessionType::Pause);
            task.status = TaskStatus::Paused;
            task.pause_time = Some(now);
            Event::TaskPaused {
                task_id: task.id.clone(),
                session_seconds,
                total_seconds: task.time_tracking.total_seconds,
                at: now,
            }
        }
        TaskAction::Resume => {
            open_session(task, now);
            Event::TaskResumed {
                task_id: task.id.clone(),
                total_seconds: task.time_tracking.total_seconds,
                at: now,
            }
        }
        TaskAction::Complete => {
            let from = task.status;
            if from == TaskStatus::InProgress {
                close_session(task, now, SessionType::Stop);
            }
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
            task.stop_time = Some(now);
            Event::TaskCompleted {
                task_id: task.id.clone(),
                from,
                total_seconds: task.time_tracking.total_seconds,
                session_count: task.time_tracking.sessions.len(),
                at: now,
            }
        }
        TaskAction::Cancel => {
            let from = task.status;
            task.status = TaskStatus::Cancelled;
            task.stop_time = Some(now);
            Event::TaskCancelled {
                task_id: task.id.clone(),
                from,
                at: now,
            }
        }
        TaskAction::Edit | TaskAction::Adjust | TaskAction::Delete => {
            return Err(invalid(task, action));
        }
    };

    task.updated_at = now;
    Ok(event)
}

fn open_session(task: &mut Task, now: DateTime<Utc>) {
    task.status = TaskStatus::InProgress;
    task.pause_time = None;
    task.paused_for_in_seconds = 0;
    task.time_tracking.current_session_start = Some(now);
    task.time_tracking.base_total_seconds = task.time_tracking.total_seconds;
}

/// Close the running session and commit its duration. Returns the seconds
/// credited.
fn close_session(task: &mut Task, now: DateTime<Utc>, session_type: SessionType) -> u64 {
    let Some(start) = task.time_tracking.current_session_start.take() else {
        return 0;
    };
    let raw = (now - start).num_seconds();
    let paused = task.paused_for_in_seconds.min(i64::MAX as u64) as i64;
    let duration = raw.saturating_sub(paused).max(0) as u64;

    task.time_tracking.sessions.push(Session {
        start_time: start,
        end_time: now,
        duration,
        session_type,
    });
    task.time_tracking.total_seconds = task.time_tracking.total_seconds.saturating_add(duration);
    task.time_tracking.base_total_seconds = task.time_tracking.total_seconds;
    task.paused_for_in_seconds = 0;
    duration
}

/// One owner's tasks, with the single-InProgress rule enforced.
///
/// The board is a local, optimistic view. Persisting a mutated task is the
/// caller's job, and [`TaskBoard::reconcile`] overwrites a snapshot once the
/// authoritative copy comes back from a backend.
pub struct TaskBoard {
    owner: String,
    tasks: Vec<Task>,
    clock: Arc<dyn Clock>,
}

impl TaskBoard {
    pub fn new(owner: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            owner: owner.into(),
            tasks: Vec::new(),
            clock,
        }
    }

    /// Build a board from stored tasks. Tasks of other owners are dropped.
    ///
    /// # Errors
    /// Returns `AnotherTaskInProgress` if more than one of the owner's tasks
    /// is InProgress.
    pub fn from_tasks(
        owner: impl Into<String>,
        tasks: Vec<Task>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LifecycleError> {
        let owner = owner.into();
        let mut board = Self::new(owner.clone(), clock);
        for task in tasks.into_iter().filter(|t| t.owner == owner) {
            board.reconcile(task)?;
        }
        Ok(board)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks in insertion order, optionally narrowed to one status.
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The task currently InProgress, if any.
    pub fn active(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.status == TaskStatus::InProgress)
    }

    pub fn elapsed_seconds(&self, id: &str) -> Result<u64, LifecycleError> {
        let now = self.clock.now();
        self.get(id)
            .map(|t| t.elapsed_seconds(now))
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn create(&mut self, title: impl Into<String>, description: Option<String>) -> &Task {
        let task = Task::new(self.owner.clone(), title, description, self.clock.now());
        self.tasks.push(task);
        &self.tasks[self.tasks.len() - 1]
    }

    /// Add an already-built task (for example one loaded from storage).
    pub fn insert(&mut self, task: Task) -> Result<&Task, LifecycleError> {
        self.reconcile(task)
    }

    pub fn start(&mut self, id: &str) -> Result<Event, LifecycleError> {
        self.apply(id, TaskAction::Start)
    }

    pub fn pause(&mut self, id: &str) -> Result<Event, LifecycleError> {
        self.apply(id, TaskAction::Pause)
    }

    pub fn resume(&mut self, id: &str) -> Result<Event, LifecycleError> {
        self.apply(id, TaskAction::Resume)
    }

    pub fn complete(&mut self, id: &str) -> Result<Event, LifecycleError> {
        self.apply(id, TaskAction::Complete)
    }

    pub fn cancel(&mut self, id: &str) -> Result<Event, LifecycleError> {
        self.apply(id, TaskAction::Cancel)
    }

    /// Append a new title/description revision. Earlier entries are kept.
    pub fn edit(
        &mut self,
        id: &str,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Event, LifecycleError> {
        let now = self.clock.now();
        let task = self.find_mut(id)?;
        if !can_apply(task.status, TaskAction::Edit) {
            return Err(invalid(task, TaskAction::Edit));
        }
        let title = title.into();
        task.history.push(HistoryEntry {
            title: title.clone(),
            description,
            created_at: now,
        });
        task.updated_at = now;
        Ok(Event::TaskEdited {
            task_id: task.id.clone(),
            title,
            revision: task.history.len(),
            at: now,
        })
    }

    /// Discount `seconds` from the running session, e.g. a forgotten break.
    pub fn adjust_paused_for(&mut self, id: &str, seconds: u64) -> Result<Event, LifecycleError> {
        let now = self.clock.now();
        let task = self.find_mut(id)?;
        if !can_apply(task.status, TaskAction::Adjust) {
            return Err(invalid(task, TaskAction::Adjust));
        }
        task.paused_for_in_seconds = task.paused_for_in_seconds.saturating_add(seconds);
        task.updated_at = now;
        Ok(Event::TaskAdjusted {
            task_id: task.id.clone(),
            paused_for_in_seconds: task.paused_for_in_seconds,
            at: now,
        })
    }

    /// Remove a task in any status.
    pub fn delete(&mut self, id: &str) -> Result<Task, LifecycleError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
        Ok(self.tasks.remove(idx))
    }

    /// Replace the local snapshot of `task` (matched by id) with `task`.
    ///
    /// An InProgress snapshot is rejected while a different task is running;
    /// the board is left unchanged.
    pub fn reconcile(&mut self, task: Task) -> Result<&Task, LifecycleError> {
        if task.status == TaskStatus::InProgress {
            if let Some(active) = self.active().filter(|a| a.id != task.id) {
                return Err(LifecycleError::AnotherTaskInProgress {
                    task_id: task.id.clone(),
                    active_id: active.id.clone(),
                    action: TaskAction::Start,
                });
            }
        }
        match self.tasks.iter().position(|t| t.id == task.id) {
            Some(idx) => {
                self.tasks[idx] = task;
                Ok(&self.tasks[idx])
            }
            None => {
                self.tasks.push(task);
                Ok(&self.tasks[self.tasks.len() - 1])
            }
        }
    }

    /// Flag unfinished tasks from earlier local days. Returns the ids newly
    /// flagged.
    pub fn carry_forward(&mut self, offset: FixedOffset) -> Vec<String> {
        let today = local_date(self.clock.now(), offset);
        carry_over::carry_forward(&mut self.tasks, today, offset)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn find_mut(&mut self, id: &str) -> Result<&mut Task, LifecycleError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    fn apply(&mut self, id: &str, action: TaskAction) -> Result<Event, LifecycleError> {
        let now = self.clock.now();
        let enters_progress = matches!(action, TaskAction::Start | TaskAction::Resume);

        if enters_progress {
            let task = self
                .get(id)
                .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
            // Validate the task's own status first so a double start reports
            // InvalidTransition rather than blaming itself as "another task".
            if !can_apply(task.status, action) {
                return Err(invalid(task, action));
            }
            if let Some(active) = self.active().filter(|a| a.id != id) {
                return Err(LifecycleError::AnotherTaskInProgress {
                    task_id: id.to_string(),
                    active_id: active.id.clone(),
                    action,
                });
            }
        }

        let task = self.find_mut(id)?;
        transition(task, action, now)
    }
}
