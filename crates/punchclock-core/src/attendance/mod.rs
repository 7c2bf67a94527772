//! Daily attendance records.
//!
//! One [`Attendance`] per calendar day. At most one check-in and one
//! check-out per day, and a check-out needs an earlier check-in on the same
//! day. Working time and lateness are derived, never stored.

pub mod backend;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, ConfigError};
use crate::geo::GeoPoint;

pub use backend::{AttendanceBackend, LocalAttendanceBackend};

/// A check-in or check-out stamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Punch {
    pub time: DateTime<Utc>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub date: NaiveDate,
    pub check_in: Option<Punch>,
    pub check_out: Option<Punch>,
    /// Non-work seconds (breaks) taken off the working time
    #[serde(default)]
    pub deducted_seconds: u64,
}

impl Attendance {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            check_in: None,
            check_out: None,
            deducted_seconds: 0,
        }
    }

    pub fn has_checked_in(&self) -> bool {
        self.check_in.is_some()
    }

    pub fn has_checked_out(&self) -> bool {
        self.check_out.is_some()
    }

    pub fn record_check_in(
        &mut self,
        at: DateTime<Utc>,
        location: Option<GeoPoint>,
    ) -> Result<(), AttendanceError> {
        if self.check_in.is_some() {
            return Err(AttendanceError::AlreadyCheckedIn(self.date));
        }
        if self.check_out.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut(self.date));
        }
        self.check_in = Some(Punch { time: at, location });
        Ok(())
    }

    pub fn record_check_out(
        &mut self,
        at: DateTime<Utc>,
        location: Option<GeoPoint>,
    ) -> Result<(), AttendanceError> {
        let check_in = self
            .check_in
            .ok_or(AttendanceError::NotCheckedIn(self.date))?;
        if self.check_out.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut(self.date));
        }
        if at < check_in.time {
            return Err(AttendanceError::CheckOutBeforeCheckIn {
                check_in: check_in.time,
                check_out: at,
            });
        }
        self.check_out = Some(Punch { time: at, location });
        Ok(())
    }

    pub fn deduct(&mut self, seconds: u64) {
        self.deducted_seconds = self.deducted_seconds.saturating_add(seconds);
    }

    /// (check-out − check-in) − deducted, or `None` before check-out.
    pub fn working_seconds(&self) -> Option<u64> {
        let (check_in, check_out) = (self.check_in?, self.check_out?);
        Some(self.net_seconds(check_in.time, check_out.time))
    }

    /// Working seconds so far; uses `now` in place of a missing check-out.
    pub fn working_seconds_at(&self, now: DateTime<Utc>) -> Option<u64> {
        let check_in = self.check_in?;
        let end = self.check_out.map(|p| p.time).unwrap_or(now);
        Some(self.net_seconds(check_in.time, end))
    }

    pub fn working_hours(&self) -> Option<f64> {
        self.working_seconds().map(|s| s as f64 / 3600.0)
    }

    pub fn lateness(&self, shift: &ShiftPolicy) -> Result<Option<Lateness>, ConfigError> {
        let Some(check_in) = self.check_in else {
            return Ok(None);
        };
        Ok(Some(shift.lateness(self.date, check_in.time)?))
    }

    fn net_seconds(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
        let gross = (end - start).num_seconds().max(0) as u64;
        gross.saturating_sub(self.deducted_seconds)
    }
}

/// Answer of [`AttendanceBackend::today_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayStatus {
    pub attendance: Option<Attendance>,
    pub has_checked_in: bool,
    pub has_checked_out: bool,
}

impl TodayStatus {
    pub fn from_attendance(attendance: Option<Attendance>) -> Self {
        let has_checked_in = attendance.as_ref().is_some_and(Attendance::has_checked_in);
        let has_checked_out = attendance.as_ref().is_some_and(Attendance::has_checked_out);
        Self {
            attendance,
            has_checked_in,
            has_checked_out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lateness {
    pub is_late: bool,
    /// Whole minutes after shift start, `0` when on time
    pub late_by: u32,
}

/// Organization shift settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftPolicy {
    /// Shift start, local time, `HH:MM`
    #[serde(default = "default_shift_start")]
    pub start: String,
    /// Minutes after `start` still counted as on time
    #[serde(default)]
    pub grace_minutes: u32,
    /// Local offset used for day keys and shift start
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_shift_start() -> String {
    "09:00".into()
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            start: default_shift_start(),
            grace_minutes: 0,
            utc_offset_minutes: 0,
        }
    }
}

impl ShiftPolicy {
    pub fn start_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.start, "%H:%M").map_err(|e| ConfigError::InvalidValue {
            key: "shift.start".into(),
            message: e.to_string(),
        })
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "shift.utc_offset_minutes".into(),
                message: format!("{} is out of range", self.utc_offset_minutes),
            }
        })
    }

    /// Lateness of a check-in at `at` on local day `date`. Lateness is
    /// measured from shift start; the grace period only decides `is_late`.
    pub fn lateness(&self, date: NaiveDate, at: DateTime<Utc>) -> Result<Lateness, ConfigError> {
        let offset = self.offset()?;
        let local_start = date.and_time(self.start_time()?);
        let start = offset
            .from_local_datetime(&local_start)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "shift.start".into(),
                message: format!("{local_start} does not exist at offset {offset}"),
            })?;

        let late_secs = (at - start).num_seconds();
        let late_by = (late_secs.max(0) / 60).min(u32::MAX as i64) as u32;
        Ok(Lateness {
            is_late: late_secs > i64::from(self.grace_minutes) * 60,
            late_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap()
    }

    #[test]
    fn check_in_once_per_day() {
        let mut record = Attendance::new(day());
        record.record_check_in(at(9, 0), None).unwrap();
        assert_eq!(
            record.record_check_in(at(9, 5), None),
            Err(AttendanceError::AlreadyCheckedIn(day()))
        );
        assert_eq!(record.check_in.unwrap().time, at(9, 0));
    }

    #[test]
    fn check_out_requires_check_in() {
        let mut record = Attendance::new(day());
        assert_eq!(
            record.record_check_out(at(17, 0), None),
            Err(AttendanceError::NotCheckedIn(day()))
        );
        record.record_check_in(at(9, 0), None).unwrap();
        record.record_check_out(at(17, 0), None).unwrap();
        assert_eq!(
            record.record_check_out(at(18, 0), None),
            Err(AttendanceError::AlreadyCheckedOut(day()))
        );
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let mut record = Attendance::new(day());
        record.record_check_in(at(9, 0), None).unwrap();
        assert!(matches!(
            record.record_check_out(at(8, 0), None),
            Err(AttendanceError::CheckOutBeforeCheckIn { .. })
        ));
        assert!(record.check_out.is_none());
    }

    #[test]
    fn working_time_minus_deductions() {
        let mut record = Attendance::new(day());
        assert_eq!(record.working_seconds(), None);
        record.record_check_in(at(9, 0), None).unwrap();
        assert_eq!(record.working_seconds_at(at(10, 0)), Some(3600));

        record.record_check_out(at(17, 30), None).unwrap();
        record.deduct(30 * 60);
        assert_eq!(record.working_seconds(), Some(8 * 3600));
        assert_eq!(record.working_hours(), Some(8.0));
    }

    #[test]
    fn lateness_against_shift_start() {
        let shift = ShiftPolicy {
            start: "09:00".into(),
            grace_minutes: 10,
            utc_offset_minutes: 0,
        };
        let on_time = shift.lateness(day(), at(8, 55)).unwrap();
        assert_eq!(on_time, Lateness { is_late: false, late_by: 0 });

        let in_grace = shift.lateness(day(), at(9, 7)).unwrap();
        assert_eq!(in_grace, Lateness { is_late: false, late_by: 7 });

        let late = shift.lateness(day(), at(9, 25) + Duration::seconds(59)).unwrap();
        assert_eq!(late, Lateness { is_late: true, late_by: 25 });
    }

    #[test]
    fn lateness_uses_local_offset() {
        let shift = ShiftPolicy {
            start: "09:00".into(),
            grace_minutes: 0,
            utc_offset_minutes: 120,
        };
        // 07:30 UTC is 09:30 at UTC+2.
        let lateness = shift.lateness(day(), at(7, 30)).unwrap();
        assert_eq!(lateness, Lateness { is_late: true, late_by: 30 });
    }

    #[test]
    fn invalid_shift_start_is_config_error() {
        let shift = ShiftPolicy {
            start: "nine".into(),
            ..Default::default()
        };
        assert!(matches!(
            shift.lateness(day(), at(9, 0)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn today_status_flags() {
        let mut record = Attendance::new(day());
        assert_eq!(
            TodayStatus::from_attendance(None),
            TodayStatus {
                attendance: None,
                has_checked_in: false,
                has_checked_out: false
            }
        );
        record.record_check_in(at(9, 0), None).unwrap();
        let status = TodayStatus::from_attendance(Some(record));
        assert!(status.has_checked_in);
        assert!(!status.has_checked_out);
    }
}
