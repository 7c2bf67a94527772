//! State shared between the signal monitor and the check-in engine.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringState {
    pub is_monitoring: bool,
    pub last_known_ssid: Option<String>,
    pub last_check_in_attempt_at: Option<DateTime<Utc>>,
}

impl MonitoringState {
    /// Record `ssid` and report whether it differs from the last one seen.
    pub fn observe_ssid(&mut self, ssid: Option<String>) -> bool {
        if self.last_known_ssid == ssid {
            return false;
        }
        self.last_known_ssid = ssid;
        true
    }

    pub fn clear_ssid(&mut self) {
        self.last_known_ssid = None;
    }

    pub fn record_attempt(&mut self, at: DateTime<Utc>) {
        self.last_check_in_attempt_at = Some(at);
    }
}

/// Cloneable handle to one [`MonitoringState`].
#[derive(Debug, Clone, Default)]
pub struct SharedMonitoringState(Arc<Mutex<MonitoringState>>);

impl SharedMonitoringState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, MonitoringState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> MonitoringState {
        self.lock().clone()
    }
}
