//! Auto check-in settings and trigger matching.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{PresenceSignal, SettingsStore};
use crate::error::ConfigError;
use crate::geo::{GeoPoint, Geofence};

/// The office as a circle on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
}

fn default_radius() -> f64 {
    100.0
}

impl OfficeLocation {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn geofence(&self) -> Geofence {
        Geofence::new(self.center(), self.radius_meters)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeWifi {
    pub ssid: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCheckInSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Success notifications. Failures are always reported.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub office_location: Option<OfficeLocation>,
    #[serde(default)]
    pub office_wifi: Option<OfficeWifi>,
}

impl Default for AutoCheckInSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            notifications_enabled: true,
            office_location: None,
            office_wifi: None,
        }
    }
}

impl AutoCheckInSettings {
    pub fn geofence(&self) -> Option<Geofence> {
        self.office_location.as_ref().map(OfficeLocation::geofence)
    }

    /// SSID to watch for, if Wi-Fi triggering is configured and switched on.
    pub fn active_ssid(&self) -> Option<&str> {
        self.office_wifi
            .as_ref()
            .filter(|w| w.enabled && !w.ssid.is_empty())
            .map(|w| w.ssid.as_str())
    }

    pub fn ssid_matches(&self, ssid: &str) -> bool {
        self.active_ssid()
            .is_some_and(|office| office.to_lowercase() == ssid.to_lowercase())
    }

    /// Whether `signal` places the user at the office. Ignores `enabled`.
    pub fn matches(&self, signal: &PresenceSignal) -> bool {
        match signal {
            PresenceSignal::WifiChanged { ssid } => {
                ssid.as_deref().is_some_and(|s| self.ssid_matches(s))
            }
            // Leaving the office never checks anyone in.
            PresenceSignal::GeofenceExit { .. } => false,
            PresenceSignal::LocationSample { point } | PresenceSignal::GeofenceEnter { point } => {
                self.geofence().is_some_and(|fence| fence.contains(*point))
            }
        }
    }
}

/// In-process store, for tests and hosts without a config file.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    saved: Mutex<Option<AutoCheckInSettings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: AutoCheckInSettings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<AutoCheckInSettings>, ConfigError> {
        Ok(self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, settings: &AutoCheckInSettings) -> Result<(), ConfigError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(())
    }
}
