//! Attendance service seam.
//!
//! [`AttendanceBackend`] is what the auto check-in engine talks to. The real
//! product sends these calls to a server; [`LocalAttendanceBackend`] keeps
//! the records in the local SQLite database.

use std::future::Future;
use std::sync::Arc;

use chrono::FixedOffset;

use super::{Attendance, TodayStatus};
use crate::clock::{local_date, Clock};
use crate::error::{BackendError, CoreError};
use crate::events::Event;
use crate::geo::GeoPoint;
use crate::storage::SharedDatabase;

/// Remote attendance operations. Failures are opaque to callers.
pub trait AttendanceBackend: Send + Sync {
    fn check_in(
        &self,
        location: Option<GeoPoint>,
    ) -> impl Future<Output = Result<Attendance, BackendError>> + Send;

    fn check_out(
        &self,
        location: Option<GeoPoint>,
    ) -> impl Future<Output = Result<Attendance, BackendError>> + Send;

    fn today_status(&self) -> impl Future<Output = Result<TodayStatus, BackendError>> + Send;
}

impl<B: AttendanceBackend> AttendanceBackend for Arc<B> {
    fn check_in(
        &self,
        location: Option<GeoPoint>,
    ) -> impl Future<Output = Result<Attendance, BackendError>> + Send {
        (**self).check_in(location)
    }

    fn check_out(
        &self,
        location: Option<GeoPoint>,
    ) -> impl Future<Output = Result<Attendance, BackendError>> + Send {
        (**self).check_out(location)
    }

    fn today_status(&self) -> impl Future<Output = Result<TodayStatus, BackendError>> + Send {
        (**self).today_status()
    }
}

/// Attendance days stored in the local database, keyed by the local date at
/// `offset`.
#[derive(Clone)]
pub struct LocalAttendanceBackend {
    db: SharedDatabase,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl LocalAttendanceBackend {
    pub fn new(db: SharedDatabase, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { db, clock, offset }
    }

    /// Check in now. Fails if today already has a check-in or check-out.
    pub fn record_check_in(
        &self,
        location: Option<GeoPoint>,
    ) -> Result<(Attendance, Event), CoreError> {
        let now = self.clock.now();
        let today = local_date(now, self.offset);
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());

        let mut record = db
            .get_attendance(today)?
            .unwrap_or_else(|| Attendance::new(today));
        record.record_check_in(now, location)?;
        db.save_attendance(&record)?;

        tracing::info!(date = %today, "checked in");
        Ok((record, Event::CheckedIn { date: today, at: now }))
    }

    /// Check out now. Needs a check-in earlier today.
    pub fn record_check_out(
        &self,
        location: Option<GeoPoint>,
    ) -> Result<(Attendance, Event), CoreError> {
        let now = self.clock.now();
        let today = local_date(now, self.offset);
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());

        let mut record = db
            .get_attendance(today)?
            .unwrap_or_else(|| Attendance::new(today));
        record.record_check_out(now, location)?;
        db.save_attendance(&record)?;

        let working_seconds = record.working_seconds().unwrap_or(0);
        tracing::info!(date = %today, working_seconds, "checked out");
        Ok((
            record,
            Event::CheckedOut {
                date: today,
                working_seconds,
                at: now,
            },
        ))
    }

    pub fn status(&self) -> Result<TodayStatus, CoreError> {
        let today = local_date(self.clock.now(), self.offset);
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        Ok(TodayStatus::from_attendance(db.get_attendance(today)?))
    }
}

fn opaque(err: CoreError) -> BackendError {
    BackendError::new(err.to_string())
}

impl AttendanceBackend for LocalAttendanceBackend {
    async fn check_in(&self, location: Option<GeoPoint>) -> Result<Attendance, BackendError> {
        self.record_check_in(location).map(|(a, _)| a).map_err(opaque)
    }

    async fn check_out(&self, location: Option<GeoPoint>) -> Result<Attendance, BackendError> {
        self.record_check_out(location).map(|(a, _)| a).map_err(opaque)
    }

    async fn today_status(&self) -> Result<TodayStatus, BackendError> {
        self.status().map_err(opaque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::AttendanceError;
    use crate::storage::Database;
    use chrono::{Duration, TimeZone, Utc};

    fn backend() -> (LocalAttendanceBackend, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
        ));
        let db = Database::open_memory().unwrap().into_shared();
        let utc = FixedOffset::east_opt(0).unwrap();
        (LocalAttendanceBackend::new(db, clock.clone(), utc), clock)
    }

    #[test]
    fn check_in_then_out_records_working_time() {
        let (backend, clock) = backend();
        let (record, event) = backend.record_check_in(None).unwrap();
        assert!(record.has_checked_in());
        assert!(matches!(event, Event::CheckedIn { .. }));

        clock.advance(Duration::hours(8));
        let (record, event) = backend.record_check_out(None).unwrap();
        assert_eq!(record.working_seconds(), Some(8 * 3600));
        assert!(matches!(
            event,
            Event::CheckedOut {
                working_seconds: 28_800,
                ..
            }
        ));

        let status = backend.status().unwrap();
        assert!(status.has_checked_in && status.has_checked_out);
    }

    #[test]
    fn second_check_in_same_day_is_rejected() {
        let (backend, clock) = backend();
        backend.record_check_in(None).unwrap();
        clock.advance(Duration::minutes(5));
        let err = backend.record_check_in(None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Attendance(AttendanceError::AlreadyCheckedIn(_))
        ));
    }

    #[test]
    fn new_day_starts_fresh() {
        let (backend, clock) = backend();
        backend.record_check_in(None).unwrap();
        clock.advance(Duration::days(1));
        assert!(!backend.status().unwrap().has_checked_in);
        backend.record_check_in(None).unwrap();
    }

    #[tokio::test]
    async fn async_interface_maps_errors_to_backend_error() {
        let (backend, _clock) = backend();
        assert!(backend.check_out(None).await.is_err());

        let location = Some(GeoPoint::new(52.52, 13.405));
        let record = backend.check_in(location).await.unwrap();
        assert_eq!(record.check_in.unwrap().location, location);

        let status = backend.today_status().await.unwrap();
        assert!(status.has_checked_in);
        assert!(!status.has_checked_out);
    }
}
