//! Integration tests for the task lifecycle, timer and local persistence.
//!
//! | Scenario                         | Checks                                        |
//! |----------------------------------|-----------------------------------------------|
//! | start / pause / resume / complete | two sessions, 600 s total, timestamps         |
//! | invalid transitions              | error kind, task unchanged in board and db    |
//! | single running task per owner    | second start rejected, other owners allowed   |
//! | live timer                       | idempotent, monotonic, formatting             |

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use punchclock_core::task::timer::{current_elapsed_seconds, format_hms, format_hours_minutes};
use punchclock_core::task::SessionType;
use punchclock_core::{
    CoreError, Database, LifecycleError, LocalTaskBackend, ManualClock, TaskBackend, TaskStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

fn backend_for(owner: &str) -> (LocalTaskBackend, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let db = Database::open_memory().unwrap().into_shared();
    let backend = LocalTaskBackend::open(db, owner, clock.clone()).unwrap();
    (backend, clock)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn two_sessions_add_up_to_six_hundred_seconds() {
    let (mut backend, clock) = backend_for("alice");
    let task = backend.create("Quarterly report", None).unwrap();

    backend.start(&task.id).unwrap();
    clock.set(t0() + Duration::seconds(300));
    let paused = backend.pause(&task.id).unwrap();
    assert_eq!(paused.time_tracking.total_seconds, 300);
    assert_eq!(paused.pause_time, Some(t0() + Duration::seconds(300)));

    clock.set(t0() + Duration::seconds(1_000));
    backend.resume(&task.id).unwrap();
    clock.set(t0() + Duration::seconds(1_300));
    let done = backend.complete(&task.id).unwrap();

    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.time_tracking.total_seconds, 600);
    assert_eq!(done.time_tracking.sessions.len(), 2);
    assert_eq!(done.time_tracking.sessions[0].session_type, SessionType::Pause);
    assert_eq!(done.time_tracking.sessions[1].session_type, SessionType::Stop);
    assert_eq!(done.completed_at, Some(t0() + Duration::seconds(1_300)));
    assert_eq!(done.stop_time, done.completed_at);
    assert_eq!(current_elapsed_seconds(&done, t0() + Duration::days(1)), 600);
}

#[test]
fn invalid_transitions_leave_task_untouched() {
    let (mut backend, clock) = backend_for("alice");
    let task = backend.create("Report", None).unwrap();

    assert!(matches!(
        backend.resume(&task.id),
        Err(CoreError::Lifecycle(LifecycleError::InvalidTransition { .. }))
    ));

    backend.start(&task.id).unwrap();
    clock.advance(Duration::seconds(60));
    let before = backend.board().get(&task.id).unwrap().clone();
    assert!(backend.start(&task.id).is_err());
    assert!(backend.resume(&task.id).is_err());
    assert_eq!(backend.board().get(&task.id).unwrap(), &before);

    backend.cancel(&task.id).unwrap();
    for result in [
        backend.start(&task.id),
        backend.pause(&task.id),
        backend.complete(&task.id),
        backend.cancel(&task.id),
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, CoreError::Lifecycle(ref e) if e.is_invalid_transition()));
    }
}

#[test]
fn one_running_task_per_owner() {
    let (mut backend, _clock) = backend_for("alice");
    let a = backend.create("A", None).unwrap();
    let b = backend.create("B", None).unwrap();

    backend.start(&a.id).unwrap();
    let err = backend.start(&b.id).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Lifecycle(LifecycleError::AnotherTaskInProgress { ref active_id, .. })
            if active_id == &a.id
    ));

    // Another owner's board is independent.
    let (mut other, _clock) = backend_for("bob");
    let c = other.create("C", None).unwrap();
    other.start(&c.id).unwrap();
}

#[test]
fn live_timer_reads_are_stable_and_formatted() {
    let (mut backend, clock) = backend_for("alice");
    let task = backend.create("Deep work", None).unwrap();
    backend.start(&task.id).unwrap();

    clock.advance(Duration::seconds(3_725));
    let snapshot = backend.board().get(&task.id).unwrap().clone();
    let now = t0() + Duration::seconds(3_725);
    let first = current_elapsed_seconds(&snapshot, now);
    let second = current_elapsed_seconds(&snapshot, now);
    assert_eq!(first, second);
    assert_eq!(first, 3_725);
    assert!(current_elapsed_seconds(&snapshot, now + Duration::seconds(1)) > first);

    assert_eq!(format_hms(first), "01:02:05");
    assert_eq!(format_hours_minutes(first), "1 hr 2 min");

    // A clock behind the session start never yields a negative value.
    assert_eq!(current_elapsed_seconds(&snapshot, t0() - Duration::hours(1)), 0);
}
