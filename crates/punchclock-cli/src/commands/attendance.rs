use clap::Subcommand;
use punchclock_core::task::timer::format_hours_minutes;
use punchclock_core::{Attendance, GeoPoint, LocalAttendanceBackend};
use serde::Serialize;

use super::{CliResult, Env, Output};

#[derive(Subcommand)]
pub enum AttendanceAction {
    /// Check in for today
    CheckIn {
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Check out for today
    CheckOut {
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Today's record, working time so far and lateness
    Status,
}

#[derive(Serialize)]
struct StatusReport {
    attendance: Option<Attendance>,
    has_checked_in: bool,
    has_checked_out: bool,
    working_seconds: Option<u64>,
    is_late: Option<bool>,
    late_by_minutes: Option<u32>,
}

fn point(lat: Option<f64>, lon: Option<f64>) -> Option<GeoPoint> {
    Some(GeoPoint::new(lat?, lon?))
}

pub fn run(action: AttendanceAction, out: Output) -> CliResult {
    let env = Env::open()?;
    let shift = env.config.shift.clone();
    let backend = LocalAttendanceBackend::new(env.db, env.clock.clone(), shift.offset()?);

    match action {
        AttendanceAction::CheckIn { lat, lon } => {
            let (record, event) = backend.record_check_in(point(lat, lon))?;
            let lateness = record.lateness(&shift)?;
            out.emit(&event, || {
                println!("Checked in for {}", record.date);
                if let Some(l) = lateness.filter(|l| l.is_late) {
                    println!("Late by {} min", l.late_by);
                }
            })
        }
        AttendanceAction::CheckOut { lat, lon } => {
            let (record, event) = backend.record_check_out(point(lat, lon))?;
            let worked = record.working_seconds().unwrap_or(0);
            out.emit(&event, || {
                println!(
                    "Checked out for {}, worked {}",
                    record.date,
                    format_hours_minutes(worked)
                );
            })
        }
        AttendanceAction::Status => {
            let status = backend.status()?;
            let now = env.clock.now();
            let working_seconds = status
                .attendance
                .as_ref()
                .and_then(|a| a.working_seconds_at(now));
            let lateness = match &status.attendance {
                Some(a) => a.lateness(&shift)?,
                None => None,
            };
            let report = StatusReport {
                attendance: status.attendance,
                has_checked_in: status.has_checked_in,
                has_checked_out: status.has_checked_out,
                working_seconds,
                is_late: lateness.map(|l| l.is_late),
                late_by_minutes: lateness.map(|l| l.late_by),
            };
            out.emit(&report, || {
                if !report.has_checked_in {
                    println!("Not checked in today");
                    return;
                }
                let state = if report.has_checked_out {
                    "checked out"
                } else {
                    "checked in"
                };
                println!(
                    "{state}, worked {}",
                    format_hours_minutes(report.working_seconds.unwrap_or(0))
                );
                if report.is_late == Some(true) {
                    println!("Late by {} min", report.late_by_minutes.unwrap_or(0));
                }
            })
        }
    }
}
