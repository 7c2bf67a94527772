//! Core error types for punchclock-core.
//!
//! This module defines the error hierarchy using thiserror. Lifecycle and
//! attendance errors are local and always recoverable; storage and config
//! errors wrap the underlying crate errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::{TaskAction, TaskStatus};

/// Core error type for punchclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Task lifecycle violations
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Attendance record violations
    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure reported by an attendance backend
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A task transition was rejected. The task is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The action is not legal from the task's current status.
    #[error("Invalid transition: cannot {action} task {task_id} while {from:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        action: TaskAction,
    },

    /// Another task of the same owner is already in progress.
    #[error("Invalid transition: cannot {action} task {task_id}, task {active_id} is already in progress")]
    AnotherTaskInProgress {
        task_id: String,
        active_id: String,
        action: TaskAction,
    },

    /// No task with this id on the board.
    #[error("Task not found: {0}")]
    NotFound(String),
}

impl LifecycleError {
    /// True for both flavours of precondition violation.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            LifecycleError::InvalidTransition { .. } | LifecycleError::AnotherTaskInProgress { .. }
        )
    }
}

/// Daily attendance invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Already checked in on {0}")]
    AlreadyCheckedIn(chrono::NaiveDate),

    #[error("Already checked out on {0}")]
    AlreadyCheckedOut(chrono::NaiveDate),

    #[error("Cannot check out on {0} without a check-in")]
    NotCheckedIn(chrono::NaiveDate),

    #[error("Check-out time {check_out} is before check-in time {check_in}")]
    CheckOutBeforeCheckIn {
        check_in: chrono::DateTime<chrono::Utc>,
        check_out: chrono::DateTime<chrono::Utc>,
    },
}

/// Signal source failures. Non-fatal: the monitor degrades to running
/// without the affected source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Permission denied for {source_name} signal source")]
    PermissionDenied { source_name: &'static str },

    /// `start` was called outside a tokio runtime.
    #[error("No tokio runtime available to run the {source_name} signal source")]
    NoRuntime { source_name: &'static str },
}

/// Opaque failure from an external backend. The auto check-in engine treats
/// any of these as "attempt failed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Backend error: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<AttendanceError> for BackendError {
    fn from(err: AttendanceError) -> Self {
        BackendError::new(err.to_string())
    }
}

impl From<DatabaseError> for BackendError {
    fn from(err: DatabaseError) -> Self {
        BackendError::new(err.to_string())
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
