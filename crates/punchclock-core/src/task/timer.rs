//! Elapsed-time computation for tasks.
//!
//! Pure functions of a task snapshot and a caller-supplied `now`. Nothing
//! here reads the wall clock, so the result is idempotent for equal inputs
//! and a periodic re-render cannot feed back into stored totals.

use chrono::{DateTime, Utc};

use super::{Task, TaskStatus};

/// Total work seconds for `task` as of `now`.
///
/// For a running task this is the total captured when the session began,
/// plus the session's wall time minus any in-session paused seconds. The
/// session part is clamped at zero, so the result is never below the base
/// and never decreases as `now` advances.
pub fn current_elapsed_seconds(task: &Task, now: DateTime<Utc>) -> u64 {
    let tracking = &task.time_tracking;
    let session_start = match (task.status, tracking.current_session_start) {
        (TaskStatus::InProgress, Some(start)) => start,
        _ => return tracking.total_seconds,
    };

    let raw = (now - session_start).num_seconds();
    let worked = raw.saturating_sub(task.paused_for_in_seconds.min(i64::MAX as u64) as i64);
    tracking
        .base_total_seconds
        .saturating_add(worked.max(0) as u64)
}

/// Seconds of the running session only, `0` when nothing is running.
pub fn live_session_seconds(task: &Task, now: DateTime<Utc>) -> u64 {
    if task.status != TaskStatus::InProgress {
        return 0;
    }
    current_elapsed_seconds(task, now).saturating_sub(task.time_tracking.base_total_seconds)
}

/// `HH:MM:SS`, zero-padded; hours may exceed two digits.
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// `X hr Y min`, dropping the hour part under one hour.
pub fn format_hours_minutes(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours == 0 {
        format!("{minutes} min")
    } else {
        format!("{hours} hr {minutes} min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn running(base: u64, started: DateTime<Utc>, paused_for: u64) -> Task {
        let mut task = Task::new("alice", "Timer", None, started);
        task.status = TaskStatus::InProgress;
        task.time_tracking.total_seconds = base;
        task.time_tracking.base_total_seconds = base;
        task.time_tracking.current_session_start = Some(started);
        task.paused_for_in_seconds = paused_for;
        task
    }

    #[test]
    fn not_running_returns_committed_total() {
        let mut task = Task::new("alice", "Idle", None, t0());
        task.time_tracking.total_seconds = 420;
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::hours(5)), 420);

        task.status = TaskStatus::Paused;
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::hours(5)), 420);
    }

    #[test]
    fn in_progress_without_session_start_returns_total() {
        let mut task = running(100, t0(), 0);
        task.time_tracking.current_session_start = None;
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::seconds(50)), 100);
    }

    #[test]
    fn running_adds_session_to_base() {
        let task = running(300, t0(), 0);
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::seconds(125)), 425);
    }

    #[test]
    fn uses_base_not_live_total() {
        let mut task = running(300, t0(), 0);
        // A caller that wrongly wrote the live value back must not be double counted.
        task.time_tracking.total_seconds = 10_000;
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::seconds(60)), 360);
    }

    #[test]
    fn subtracts_in_session_paused_seconds() {
        let task = running(0, t0(), 40);
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::seconds(100)), 60);
    }

    #[test]
    fn clamps_session_at_zero() {
        let task = running(50, t0(), 500);
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::seconds(100)), 50);

        // Clock behind the session start.
        let task = running(50, t0(), 0);
        assert_eq!(current_elapsed_seconds(&task, t0() - Duration::seconds(30)), 50);
    }

    #[test]
    fn floors_sub_second_elapsed() {
        let task = running(0, t0(), 0);
        assert_eq!(current_elapsed_seconds(&task, t0() + Duration::milliseconds(1999)), 1);
    }

    #[test]
    fn live_session_excludes_base() {
        let task = running(300, t0(), 0);
        assert_eq!(live_session_seconds(&task, t0() + Duration::seconds(30)), 30);

        let mut paused = task.clone();
        paused.status = TaskStatus::Paused;
        assert_eq!(live_session_seconds(&paused, t0() + Duration::seconds(30)), 0);
    }

    #[test]
    fn formats_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3_661), "01:01:01");
        assert_eq!(format_hms(3_599), "00:59:59");
        assert_eq!(format_hms(360_000), "100:00:00");
    }

    #[test]
    fn formats_hours_minutes_with_floor() {
        assert_eq!(format_hours_minutes(59), "0 min");
        assert_eq!(format_hours_minutes(119), "1 min");
        assert_eq!(format_hours_minutes(3_600), "1 hr 0 min");
        assert_eq!(format_hours_minutes(7_199), "1 hr 59 min");
    }

    proptest! {
        #[test]
        fn idempotent_for_same_snapshot(base in 0u64..1_000_000, offset in -10_000i64..100_000, paused in 0u64..5_000) {
            let task = running(base, t0(), paused);
            let now = t0() + Duration::seconds(offset);
            prop_assert_eq!(current_elapsed_seconds(&task, now), current_elapsed_seconds(&task, now));
        }

        #[test]
        fn monotonic_while_in_progress(base in 0u64..1_000_000, a in -10_000i64..100_000, step in 0i64..100_000, paused in 0u64..5_000) {
            let task = running(base, t0(), paused);
            let earlier = current_elapsed_seconds(&task, t0() + Duration::seconds(a));
            let later = current_elapsed_seconds(&task, t0() + Duration::seconds(a + step));
            prop_assert!(later >= earlier);
            prop_assert!(earlier >= base);
        }
    }
}
