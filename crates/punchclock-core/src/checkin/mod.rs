//! Automatic attendance check-in.
//!
//! Background [`monitor`] sources turn location and Wi-Fi readings into
//! [`PresenceSignal`]s. The [`AutoCheckInEngine`] decides, per signal,
//! whether a check-in is due and dispatches at most one per day.
//!
//! The traits here are the seams to the host platform: permissions,
//! user-visible notifications, and persisted settings.

pub mod engine;
pub mod monitor;
pub mod settings;
pub mod signal;
pub mod state;

pub use engine::{spawn_dispatcher, AutoCheckInEngine, CheckInOutcome, IgnoreReason};
pub use monitor::{
    LocationProvider, LocationSource, MonitoringConfig, SignalMonitor, SignalSource, WifiProvider,
    WifiSource,
};
pub use settings::{AutoCheckInSettings, MemorySettingsStore, OfficeLocation, OfficeWifi};
pub use signal::PresenceSignal;
pub use state::{MonitoringState, SharedMonitoringState};

use crate::error::ConfigError;

/// OS location permission.
pub trait PermissionProvider: Send + Sync {
    fn has_location_permission(&self) -> bool;

    /// Ask the user. Returns the permission state afterwards.
    fn request_location_permission(&self) -> bool {
        self.has_location_permission()
    }
}

/// User-visible notification delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Persistence for [`AutoCheckInSettings`] across restarts.
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<AutoCheckInSettings>, ConfigError>;

    fn save(&self, settings: &AutoCheckInSettings) -> Result<(), ConfigError>;
}

/// Fixed permission answer, for hosts without a permission prompt.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    pub location: bool,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self { location: true }
    }

    pub fn denied() -> Self {
        Self { location: false }
    }
}

impl PermissionProvider for StaticPermissions {
    fn has_location_permission(&self) -> bool {
        self.location
    }
}

/// Writes notifications to the log instead of the screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}
