//! Background presence signal sources.
//!
//! Each source is a detached tokio task polling a hardware provider on an
//! interval and pushing [`PresenceSignal`]s into an unbounded channel.
//! Stopping flips a `watch` flag the task checks before every poll, so a poll
//! already running may finish but nothing further is scheduled.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::{AutoCheckInSettings, PermissionProvider, PresenceSignal, SharedMonitoringState};
use crate::error::MonitorError;
use crate::geo::{GeoPoint, Geofence, GeofenceTracker, GeofenceTransition};

/// Location polls never run more often than this.
pub const MIN_LOCATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_WIFI_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Current device position, `None` when no fix is available.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> Option<GeoPoint>;
}

/// SSID of the connected network, `None` when disconnected.
pub trait WifiProvider: Send + Sync {
    fn current_ssid(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_location_interval_secs")]
    pub location_interval_secs: u64,
    #[serde(default = "default_wifi_poll_secs")]
    pub wifi_poll_secs: u64,
}

fn default_location_interval_secs() -> u64 {
    MIN_LOCATION_INTERVAL.as_secs()
}

fn default_wifi_poll_secs() -> u64 {
    DEFAULT_WIFI_POLL_INTERVAL.as_secs()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            location_interval_secs: default_location_interval_secs(),
            wifi_poll_secs: default_wifi_poll_secs(),
        }
    }
}

impl MonitoringConfig {
    /// Configured location interval, clamped to [`MIN_LOCATION_INTERVAL`].
    pub fn location_interval(&self) -> Duration {
        Duration::from_secs(self.location_interval_secs).max(MIN_LOCATION_INTERVAL)
    }

    pub fn wifi_interval(&self) -> Duration {
        Duration::from_secs(self.wifi_poll_secs.max(1))
    }
}

/// A pluggable producer of presence signals.
pub trait SignalSource: Send {
    fn name(&self) -> &'static str;

    /// Begin emitting into `sender`. A running source stays running.
    fn try_start(&mut self, sender: mpsc::UnboundedSender<PresenceSignal>)
        -> Result<(), MonitorError>;

    /// Like [`try_start`](Self::try_start), logging failures. Returns whether
    /// the source is running afterwards.
    fn start(&mut self, sender: mpsc::UnboundedSender<PresenceSignal>) -> bool {
        match self.try_start(sender) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "signal source not started");
                false
            }
        }
    }

    /// Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

fn require_location_permission(
    permissions: &dyn PermissionProvider,
    source_name: &'static str,
) -> Result<(), MonitorError> {
    if permissions.has_location_permission() || permissions.request_location_permission() {
        Ok(())
    } else {
        Err(MonitorError::PermissionDenied { source_name })
    }
}

fn runtime(source_name: &'static str) -> Result<tokio::runtime::Handle, MonitorError> {
    tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime { source_name })
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Periodic position polls plus edge-triggered office geofence crossings.
pub struct LocationSource {
    provider: Arc<dyn LocationProvider>,
    permissions: Arc<dyn PermissionProvider>,
    fence: Option<Geofence>,
    interval: Duration,
    shutdown: Option<watch::Sender<bool>>,
}

impl LocationSource {
    pub const NAME: &'static str = "location";

    /// `interval` is clamped to [`MIN_LOCATION_INTERVAL`].
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        permissions: Arc<dyn PermissionProvider>,
        fence: Option<Geofence>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            permissions,
            fence,
            interval: interval.max(MIN_LOCATION_INTERVAL),
            shutdown: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl SignalSource for LocationSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn try_start(
        &mut self,
        sender: mpsc::UnboundedSender<PresenceSignal>,
    ) -> Result<(), MonitorError> {
        if self.shutdown.is_some() {
            return Ok(());
        }
        require_location_permission(self.permissions.as_ref(), Self::NAME)?;
        let handle = runtime(Self::NAME)?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let provider = Arc::clone(&self.provider);
        let mut tracker = self.fence.map(GeofenceTracker::new);
        let period = self.interval;

        handle.spawn(async move {
            let mut ticker = ticker(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                if *shutdown_rx.borrow() {
                    break;
                }

                let Some(point) = provider.current_position() else {
                    tracing::debug!("no location fix");
                    continue;
                };
                let mut signals = vec![PresenceSignal::LocationSample { point }];
                match tracker.as_mut().and_then(|t| t.observe(point)) {
                    Some(GeofenceTransition::Enter) => {
                        signals.push(PresenceSignal::GeofenceEnter { point })
                    }
                    Some(GeofenceTransition::Exit) => {
                        signals.push(PresenceSignal::GeofenceExit { point })
                    }
                    None => {}
                }
                if signals.into_iter().any(|s| sender.send(s).is_err()) {
                    break;
                }
            }
            tracing::debug!(
                inside = ?tracker.as_ref().and_then(GeofenceTracker::is_inside),
                "location source stopped"
            );
        });

        self.shutdown = Some(shutdown_tx);
        tracing::info!(interval_secs = period.as_secs(), "location source started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
            tracing::info!("location source stopping");
        }
    }

    fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }
}

/// Polls the connected SSID and reports changes only.
pub struct WifiSource {
    provider: Arc<dyn WifiProvider>,
    permissions: Arc<dyn PermissionProvider>,
    state: SharedMonitoringState,
    interval: Duration,
    shutdown: Option<watch::Sender<bool>>,
}

impl WifiSource {
    pub const NAME: &'static str = "wifi";

    pub fn new(
        provider: Arc<dyn WifiProvider>,
        permissions: Arc<dyn PermissionProvider>,
        state: SharedMonitoringState,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            permissions,
            state,
            interval,
            shutdown: None,
        }
    }
}

impl SignalSource for WifiSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn try_start(
        &mut self,
        sender: mpsc::UnboundedSender<PresenceSignal>,
    ) -> Result<(), MonitorError> {
        if self.shutdown.is_some() {
            return Ok(());
        }
        // Reading the SSID needs location permission on mobile platforms.
        require_location_permission(self.permissions.as_ref(), Self::NAME)?;
        let handle = runtime(Self::NAME)?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let provider = Arc::clone(&self.provider);
        let state = self.state.clone();
        let period = self.interval;

        handle.spawn(async move {
            let mut ticker = ticker(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                let ssid = provider.current_ssid();
                let changed = {
                    // The flag is read under the state lock so a concurrent
                    // stop() cannot have its SSID reset overwritten.
                    let mut state = state.lock();
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    state.observe_ssid(ssid.clone())
                };
                if changed && sender.send(PresenceSignal::WifiChanged { ssid }).is_err() {
                    break;
                }
            }
            tracing::debug!("wifi source stopped");
        });

        self.shutdown = Some(shutdown_tx);
        tracing::info!(interval_secs = period.as_secs(), "wifi source started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
            tracing::info!("wifi source stopping");
        }
        self.state.lock().clear_ssid();
    }

    fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }
}

/// Owns the signal sources and the channel they feed.
pub struct SignalMonitor {
    sources: Vec<Box<dyn SignalSource>>,
    sender: mpsc::UnboundedSender<PresenceSignal>,
    state: SharedMonitoringState,
}

impl SignalMonitor {
    pub fn new(state: SharedMonitoringState) -> (Self, mpsc::UnboundedReceiver<PresenceSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let monitor = Self {
            sources: Vec::new(),
            sender,
            state,
        };
        (monitor, receiver)
    }

    /// A monitor with a source for every trigger `settings` configures.
    /// Disabled settings yield a monitor with no sources.
    pub fn from_settings(
        settings: &AutoCheckInSettings,
        config: &MonitoringConfig,
        location: Arc<dyn LocationProvider>,
        wifi: Arc<dyn WifiProvider>,
        permissions: Arc<dyn PermissionProvider>,
        state: SharedMonitoringState,
    ) -> (Self, mpsc::UnboundedReceiver<PresenceSignal>) {
        let (mut monitor, receiver) = Self::new(state.clone());
        if !settings.enabled {
            return (monitor, receiver);
        }
        if let Some(fence) = settings.geofence() {
            monitor.add_source(Box::new(LocationSource::new(
                location,
                Arc::clone(&permissions),
                Some(fence),
                config.location_interval(),
            )));
        }
        if settings.active_ssid().is_some() {
            monitor.add_source(Box::new(WifiSource::new(
                wifi,
                permissions,
                state,
                config.wifi_interval(),
            )));
        }
        (monitor, receiver)
    }

    pub fn add_source(&mut self, source: Box<dyn SignalSource>) {
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Extra handle for pushing signals by hand.
    pub fn sender(&self) -> mpsc::UnboundedSender<PresenceSignal> {
        self.sender.clone()
    }

    /// Start every source. Idempotent. Returns `true` if at least one source
    /// is running; sources that fail (e.g. missing permission) are skipped.
    pub fn start(&mut self) -> bool {
        let mut any = false;
        for source in &mut self.sources {
            any |= source.start(self.sender.clone());
        }
        self.state.lock().is_monitoring = any;
        if !any {
            tracing::warn!("monitoring not started: no signal source available");
        }
        any
    }

    /// Stop every source. Always succeeds and always clears the last SSID.
    pub fn stop(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
        let mut state = self.state.lock();
        state.is_monitoring = false;
        state.clear_ssid();
    }

    pub fn is_monitoring(&self) -> bool {
        self.state.lock().is_monitoring
    }
}

impl Drop for SignalMonitor {
    fn drop(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
    }
}
