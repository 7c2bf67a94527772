//! # Punchclock Core Library
//!
//! This library provides the time-accounting core of an employee attendance
//! and task-tracking product. All operations are available through the
//! standalone `punchclock` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Task lifecycle**: a validated state machine per task plus a per-owner
//!   board enforcing a single running task
//! - **Timer**: pure elapsed-time derivation from a task snapshot and a clock
//! - **Auto check-in**: background location/Wi-Fi signal sources feeding an
//!   engine that checks in at most once per day
//! - **Storage**: SQLite task/attendance storage and TOML configuration
//!
//! ## Key Components
//!
//! - [`TaskBoard`]: task state machine over one owner's tasks
//! - [`AutoCheckInEngine`]: presence signal evaluation and dispatch
//! - [`SignalMonitor`]: start/stop of the background signal sources
//! - [`Database`]: task and attendance persistence
//! - [`Config`]: application configuration management

pub mod attendance;
pub mod checkin;
pub mod clock;
pub mod error;
pub mod events;
pub mod geo;
pub mod storage;
pub mod task;

pub use attendance::{Attendance, AttendanceBackend, LocalAttendanceBackend, ShiftPolicy, TodayStatus};
pub use checkin::{
    AutoCheckInEngine, AutoCheckInSettings, CheckInOutcome, IgnoreReason, PresenceSignal,
    SignalMonitor,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    AttendanceError, BackendError, ConfigError, CoreError, DatabaseError, LifecycleError,
    MonitorError,
};
pub use events::Event;
pub use geo::{distance_meters, is_within_radius, GeoPoint};
pub use storage::{Config, Database};
pub use task::{LocalTaskBackend, Priority, Task, TaskAction, TaskBackend, TaskBoard, TaskStatus};
