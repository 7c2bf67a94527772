//! SQLite-based storage for tasks and attendance days.
//!
//! Provides persistent storage for:
//! - Tasks (full record as JSON, owner/status lifted out for queries)
//! - Attendance records keyed by calendar day

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::attendance::Attendance;
use crate::error::{CoreError, DatabaseError};
use crate::task::Task;

/// A database shared between the CLI thread and async backends.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// SQLite database for task and attendance storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/punchclock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("punchclock.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        migrations::migrate(&db.conn)?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        migrations::migrate(&db.conn)?;
        Ok(db)
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert or replace a task.
    pub fn save_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(task).map_err(|e| DatabaseError::CorruptRow {
            table: "tasks",
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT INTO tasks (id, owner, status, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                owner = excluded.owner,
                status = excluded.status,
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![
                task.id,
                task.owner,
                task.status.as_str(),
                data,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, DatabaseError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM tasks WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        data.map(|d| decode_task(&d)).transpose()
    }

    /// Tasks of one owner, oldest first.
    pub fn list_tasks(&self, owner: &str) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM tasks WHERE owner = ?1 ORDER BY created_at, id")?;
        let rows = stmt.query_map(params![owner], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(decode_task(&row?)?);
        }
        Ok(tasks)
    }

    /// Returns `true` if a row was removed.
    pub fn delete_task(&self, id: &str) -> Result<bool, DatabaseError> {
        let removed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    // ── Attendance ───────────────────────────────────────────────────

    pub fn save_attendance(&self, attendance: &Attendance) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(attendance).map_err(|e| DatabaseError::CorruptRow {
            table: "attendance",
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT INTO attendance (date, data) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET data = excluded.data",
            params![attendance.date.to_string(), data],
        )?;
        Ok(())
    }

    pub fn get_attendance(&self, date: NaiveDate) -> Result<Option<Attendance>, DatabaseError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM attendance WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| decode_attendance(&d)).transpose()
    }

    /// Days in `[from, to]`, oldest first.
    pub fn list_attendance(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT data FROM attendance WHERE date >= ?1 AND date <= ?2 ORDER BY date",
        )?;
        let rows = stmt.query_map(params![from.to_string(), to.to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut days = Vec::new();
        for row in rows {
            days.push(decode_attendance(&row?)?);
        }
        Ok(days)
    }
}

fn decode_task(data: &str) -> Result<Task, DatabaseError> {
    serde_json::from_str(data).map_err(|e| DatabaseError::CorruptRow {
        table: "tasks",
        message: e.to_string(),
    })
}

fn decode_attendance(data: &str) -> Result<Attendance, DatabaseError> {
    serde_json::from_str(data).map_err(|e| DatabaseError::CorruptRow {
        table: "attendance",
        message: e.to_string(),
    })
}
