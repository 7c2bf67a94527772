//! Auto check-in settings and manual signal injection.

use std::sync::Arc;

use clap::Subcommand;
use punchclock_core::checkin::{
    LogNotificationSink, OfficeLocation, OfficeWifi, SettingsStore, SharedMonitoringState,
};
use punchclock_core::storage::ConfigSettingsStore;
use punchclock_core::{
    AutoCheckInEngine, AutoCheckInSettings, CheckInOutcome, GeoPoint, LocalAttendanceBackend,
    PresenceSignal,
};
use serde_json::json;

use super::{CliResult, Env, Output};

#[derive(Subcommand)]
pub enum AutoCheckInAction {
    /// Show the current settings
    Show,
    /// Turn automatic check-in on
    Enable,
    /// Turn automatic check-in off
    Disable,
    /// Set or clear the office location
    Office {
        #[arg(long, requires = "lon", conflicts_with = "clear")]
        lat: Option<f64>,
        #[arg(long, requires = "lat", conflicts_with = "clear")]
        lon: Option<f64>,
        /// Geofence radius in meters
        #[arg(long, default_value = "100")]
        radius: f64,
        #[arg(long)]
        clear: bool,
    },
    /// Set or clear the office Wi-Fi network
    Wifi {
        #[arg(required_unless_present = "clear")]
        ssid: Option<String>,
        /// Keep the SSID but stop matching on it
        #[arg(long)]
        disabled: bool,
        #[arg(long, conflicts_with = "ssid")]
        clear: bool,
    },
    /// Feed one presence signal through the engine
    Signal {
        #[arg(long, requires = "lon", conflicts_with = "ssid")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Connected SSID; omit with --disconnected
        #[arg(long)]
        ssid: Option<String>,
        #[arg(long, conflicts_with_all = ["ssid", "lat"])]
        disconnected: bool,
    },
}

fn print_settings(settings: &AutoCheckInSettings) {
    println!("enabled:       {}", settings.enabled);
    println!("notifications: {}", settings.notifications_enabled);
    match &settings.office_location {
        Some(o) => println!(
            "office:        {:.6}, {:.6} (radius {} m)",
            o.latitude, o.longitude, o.radius_meters
        ),
        None => println!("office:        -"),
    }
    match &settings.office_wifi {
        Some(w) if w.enabled => println!("wifi:          {}", w.ssid),
        Some(w) => println!("wifi:          {} (disabled)", w.ssid),
        None => println!("wifi:          -"),
    }
}

fn signal_from_args(
    lat: Option<f64>,
    lon: Option<f64>,
    ssid: Option<String>,
    disconnected: bool,
) -> Result<PresenceSignal, String> {
    match (lat, lon, ssid) {
        (Some(lat), Some(lon), _) => Ok(PresenceSignal::LocationSample {
            point: GeoPoint::new(lat, lon),
        }),
        (_, _, Some(ssid)) => Ok(PresenceSignal::WifiChanged { ssid: Some(ssid) }),
        _ if disconnected => Ok(PresenceSignal::WifiChanged { ssid: None }),
        _ => Err("give --lat/--lon, --ssid or --disconnected".into()),
    }
}

pub fn run(action: AutoCheckInAction, out: Output) -> CliResult {
    let store = ConfigSettingsStore::open()?;
    let mut settings = store.load()?.unwrap_or_default();

    match action {
        AutoCheckInAction::Show => {}
        AutoCheckInAction::Enable => settings.enabled = true,
        AutoCheckInAction::Disable => settings.enabled = false,
        AutoCheckInAction::Office {
            lat,
            lon,
            radius,
            clear,
        } => {
            settings.office_location = match (lat, lon) {
                _ if clear => None,
                (Some(latitude), Some(longitude)) => {
                    let office = OfficeLocation {
                        latitude,
                        longitude,
                        radius_meters: radius,
                    };
                    if !office.center().is_valid() || radius.is_nan() || radius < 0.0 {
                        return Err("office location out of range".into());
                    }
                    Some(office)
                }
                _ => return Err("give --lat and --lon, or --clear".into()),
            };
        }
        AutoCheckInAction::Wifi {
            ssid,
            disabled,
            clear,
        } => {
            settings.office_wifi = match ssid {
                _ if clear => None,
                Some(ssid) => Some(OfficeWifi {
                    ssid,
                    enabled: !disabled,
                }),
                None => return Err("give an SSID or --clear".into()),
            };
        }
        AutoCheckInAction::Signal {
            lat,
            lon,
            ssid,
            disconnected,
        } => {
            let signal = signal_from_args(lat, lon, ssid, disconnected)?;
            return run_signal(signal, store, out);
        }
    }

    store.save(&settings)?;
    out.emit(&settings, || print_settings(&settings))
}

fn run_signal(signal: PresenceSignal, store: ConfigSettingsStore, out: Output) -> CliResult {
    let env = Env::open()?;
    let offset = env.config.shift.offset()?;
    let backend = LocalAttendanceBackend::new(env.db, env.clock.clone(), offset);
    let engine = AutoCheckInEngine::new(
        backend,
        Arc::new(store),
        Arc::new(LogNotificationSink),
        env.clock,
        offset,
        SharedMonitoringState::new(),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(engine.on_presence_signal(signal));

    let value = match &outcome {
        CheckInOutcome::CheckedIn(attendance) => {
            json!({ "outcome": "checked_in", "attendance": attendance })
        }
        CheckInOutcome::Ignored(reason) => {
            json!({ "outcome": "ignored", "reason": format!("{reason:?}") })
        }
        CheckInOutcome::Failed(err) => json!({ "outcome": "failed", "error": err.message }),
    };
    out.emit(&value, || match &outcome {
        CheckInOutcome::CheckedIn(a) => println!("Checked in for {}", a.date),
        CheckInOutcome::Ignored(reason) => println!("Signal ignored: {reason:?}"),
        CheckInOutcome::Failed(err) => println!("Check-in failed: {err}"),
    })
}
