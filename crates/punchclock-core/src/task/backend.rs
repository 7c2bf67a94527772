//! Task service seam.
//!
//! Every call returns the authoritative task after the operation. A remote
//! implementation would send the request and hand the reply to
//! [`TaskBoard::reconcile`]; [`LocalTaskBackend`] applies the change to its
//! board and writes the result to SQLite.

use std::sync::Arc;

use chrono::FixedOffset;

use super::{Task, TaskBoard};
use crate::clock::Clock;
use crate::error::{CoreError, LifecycleError};
use crate::events::Event;
use crate::storage::SharedDatabase;

pub trait TaskBackend {
    fn create(&mut self, title: &str, description: Option<String>) -> Result<Task, CoreError>;

    fn start(&mut self, id: &str) -> Result<Task, CoreError>;

    fn pause(&mut self, id: &str) -> Result<Task, CoreError>;

    fn resume(&mut self, id: &str) -> Result<Task, CoreError>;

    fn complete(&mut self, id: &str) -> Result<Task, CoreError>;

    fn cancel(&mut self, id: &str) -> Result<Task, CoreError>;

    /// New title/description revision.
    fn update(
        &mut self,
        id: &str,
        title: &str,
        description: Option<String>,
    ) -> Result<Task, CoreError>;

    /// Returns the removed task.
    fn delete(&mut self, id: &str) -> Result<Task, CoreError>;
}

/// One owner's board persisted to the local database.
pub struct LocalTaskBackend {
    board: TaskBoard,
    db: SharedDatabase,
}

impl LocalTaskBackend {
    /// Load `owner`'s tasks from `db`.
    pub fn open(
        db: SharedDatabase,
        owner: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        let owner = owner.into();
        let tasks = db
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .list_tasks(&owner)?;
        Ok(Self {
            board: TaskBoard::from_tasks(owner, tasks, clock)?,
            db,
        })
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String, CoreError> {
        if self.board.get(id_or_prefix).is_some() {
            return Ok(id_or_prefix.to_string());
        }
        let mut matches = self
            .board
            .tasks()
            .iter()
            .filter(|t| t.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) if !id_or_prefix.is_empty() => Ok(task.id.clone()),
            _ => Err(LifecycleError::NotFound(id_or_prefix.to_string()).into()),
        }
    }

    /// Overwrite the stored copy of `task` (matched by id) and persist it.
    pub fn reconcile(&mut self, task: Task) -> Result<Task, CoreError> {
        let task = self.board.reconcile(task)?.clone();
        self.db
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .save_task(&task)?;
        Ok(task)
    }

    /// Discount `seconds` from the running session of `id`.
    pub fn adjust_paused_for(&mut self, id: &str, seconds: u64) -> Result<Task, CoreError> {
        let event = self.board.adjust_paused_for(id, seconds)?;
        self.commit(id, event)
    }

    /// Roll unfinished tasks from earlier days into today and persist them.
    pub fn carry_forward(&mut self, offset: FixedOffset) -> Result<Vec<String>, CoreError> {
        let ids = self.board.carry_forward(offset);
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        for id in &ids {
            if let Some(task) = self.board.get(id) {
                db.save_task(task)?;
            }
        }
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "carried tasks forward");
        }
        Ok(ids)
    }

    fn commit(&self, id: &str, event: Event) -> Result<Task, CoreError> {
        let task = self
            .board
            .get(id)
            .cloned()
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
        self.db
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .save_task(&task)?;
        tracing::debug!(?event, "task event");
        Ok(task)
    }
}

impl TaskBackend for LocalTaskBackend {
    fn create(&mut self, title: &str, description: Option<String>) -> Result<Task, CoreError> {
        let task = self.board.create(title, description).clone();
        let event = Event::TaskCreated {
            task_id: task.id.clone(),
            title: title.to_string(),
            at: task.created_at,
        };
        self.commit(&task.id, event)
    }

    fn start(&mut self, id: &str) -> Result<Task, CoreError> {
        let event = self.board.start(id)?;
        self.commit(id, event)
    }

    fn pause(&mut self, id: &str) -> Result<Task, CoreError> {
        let event = self.board.pause(id)?;
        self.commit(id, event)
    }

    fn resume(&mut self, id: &str) -> Result<Task, CoreError> {
        let event = self.board.resume(id)?;
        self.commit(id, event)
    }

    fn complete(&mut self, id: &str) -> Result<Task, CoreError> {
        let event = self.board.complete(id)?;
        self.commit(id, event)
    }

    fn cancel(&mut self, id: &str) -> Result<Task, CoreError> {
        let event = self.board.cancel(id)?;
        self.commit(id, event)
    }

    fn update(
        &mut self,
        id: &str,
        title: &str,
        description: Option<String>,
    ) -> Result<Task, CoreError> {
        let event = self.board.edit(id, title, description)?;
        self.commit(id, event)
    }

    fn delete(&mut self, id: &str) -> Result<Task, CoreError> {
        let task = self.board.delete(id)?;
        self.db
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .delete_task(id)?;
        tracing::debug!(task_id = id, "task deleted");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::Database;
    use crate::task::TaskStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (LocalTaskBackend, SharedDatabase, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
        ));
        let db = Database::open_memory().unwrap().into_shared();
        let backend = LocalTaskBackend::open(db.clone(), "alice", clock.clone()).unwrap();
        (backend, db, clock)
    }

    #[test]
    fn operations_are_persisted() {
        let (mut backend, db, clock) = setup();
        let task = backend.create("Report", None).unwrap();
        backend.start(&task.id).unwrap();
        clock.advance(Duration::seconds(90));
        backend.pause(&task.id).unwrap();

        let stored = db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Paused);
        assert_eq!(stored.time_tracking.total_seconds, 90);
    }

    #[test]
    fn reopen_restores_board() {
        let (mut backend, db, clock) = setup();
        let a = backend.create("A", None).unwrap();
        backend.start(&a.id).unwrap();

        let reopened = LocalTaskBackend::open(db, "alice", clock).unwrap();
        assert_eq!(reopened.board().active().unwrap().id, a.id);
    }

    #[test]
    fn rejected_transition_is_not_persisted() {
        let (mut backend, db, _clock) = setup();
        let task = backend.create("Report", None).unwrap();
        let err = backend.pause(&task.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));
        let stored = db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[test]
    fn reconcile_overwrites_stored_task() {
        let (mut backend, db, _clock) = setup();
        let task = backend
            .create("Report", None)
            .unwrap()
            .with_priority(crate::task::Priority::Urgent);
        backend.reconcile(task.clone()).unwrap();
        let stored = db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.priority, crate::task::Priority::Urgent);
    }

    #[test]
    fn reconcile_of_second_running_task_is_not_persisted() {
        let (mut backend, db, _clock) = setup();
        let a = backend.create("A", None).unwrap();
        let mut b = backend.create("B", None).unwrap();
        backend.start(&a.id).unwrap();

        b.status = TaskStatus::InProgress;
        let err = backend.reconcile(b.clone()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Lifecycle(LifecycleError::AnotherTaskInProgress { .. })
        ));
        let stored = db.lock().unwrap().get_task(&b.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[test]
    fn delete_removes_row() {
        let (mut backend, db, _clock) = setup();
        let task = backend.create("Report", None).unwrap();
        backend.delete(&task.id).unwrap();
        assert!(db.lock().unwrap().get_task(&task.id).unwrap().is_none());
        assert!(backend.delete(&task.id).is_err());
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let (mut backend, _db, _clock) = setup();
        let task = backend.create("Report", None).unwrap();
        assert_eq!(backend.resolve_id(&task.id[..8]).unwrap(), task.id);
        assert!(backend.resolve_id("").is_err());
        assert!(backend.resolve_id("zzzz").is_err());
    }

    #[test]
    fn carry_forward_persists_flag() {
        let (mut backend, db, clock) = setup();
        let task = backend.create("Old", None).unwrap();
        clock.advance(Duration::days(1));

        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(backend.carry_forward(utc).unwrap(), vec![task.id.clone()]);
        let stored = db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert!(stored.is_carried_forward);
    }
}
