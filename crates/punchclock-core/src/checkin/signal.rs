use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Evidence that the user may be at the office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceSignal {
    /// Periodic position poll
    LocationSample { point: GeoPoint },
    GeofenceEnter { point: GeoPoint },
    GeofenceExit { point: GeoPoint },
    /// `None` when disconnected
    WifiChanged { ssid: Option<String> },
}

impl PresenceSignal {
    /// Position carried by the signal, recorded with the check-in.
    pub fn location(&self) -> Option<GeoPoint> {
        match self {
            PresenceSignal::LocationSample { point }
            | PresenceSignal::GeofenceEnter { point }
            | PresenceSignal::GeofenceExit { point } => Some(*point),
            PresenceSignal::WifiChanged { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PresenceSignal::LocationSample { .. } => "location_sample",
            PresenceSignal::GeofenceEnter { .. } => "geofence_enter",
            PresenceSignal::GeofenceExit { .. } => "geofence_exit",
            PresenceSignal::WifiChanged { .. } => "wifi_changed",
        }
    }
}
