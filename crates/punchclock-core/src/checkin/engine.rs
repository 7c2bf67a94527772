//! Auto check-in decision and dispatch.
//!
//! For every [`PresenceSignal`] the engine checks, in order: auto check-in is
//! enabled, no check-in today (stored or already dispatched), no check-out
//! today, and the signal matches an office trigger. The check and the
//! "dispatched" mark happen under one async mutex, so any number of
//! concurrent signals produce at most one backend `check_in` per day.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::{
    AutoCheckInSettings, NotificationSink, PresenceSignal, SettingsStore, SharedMonitoringState,
};
use crate::attendance::{Attendance, AttendanceBackend};
use crate::clock::{local_date, Clock};
use crate::error::{BackendError, ConfigError};

/// Why a signal did not lead to a check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Disabled,
    SettingsUnavailable,
    AlreadyCheckedIn,
    /// Another signal's check-in is still waiting on the backend
    AttemptInFlight,
    AlreadyCheckedOut,
    NoMatchingTrigger,
    /// `today_status` failed; no attempt without knowing today's state
    StatusUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    CheckedIn(Attendance),
    Ignored(IgnoreReason),
    Failed(BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InFlight,
    Succeeded,
}

#[derive(Debug, Clone, Copy)]
struct Dispatch {
    day: NaiveDate,
    phase: Phase,
}

pub struct AutoCheckInEngine<B> {
    backend: B,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    state: SharedMonitoringState,
    dispatch: Mutex<Option<Dispatch>>,
}

impl<B: AttendanceBackend> AutoCheckInEngine<B> {
    pub fn new(
        backend: B,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        state: SharedMonitoringState,
    ) -> Self {
        Self {
            backend,
            settings,
            notifier,
            clock,
            offset,
            state,
            dispatch: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &SharedMonitoringState {
        &self.state
    }

    /// Current settings; defaults (disabled) if nothing was saved.
    pub fn settings(&self) -> Result<AutoCheckInSettings, ConfigError> {
        Ok(self.settings.load()?.unwrap_or_default())
    }

    pub fn update_settings(&self, settings: &AutoCheckInSettings) -> Result<(), ConfigError> {
        self.settings.save(settings)
    }

    /// Evaluate one signal and check in if it is due.
    pub async fn on_presence_signal(&self, signal: PresenceSignal) -> CheckInOutcome {
        let kind = signal.kind();
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "auto check-in settings unavailable");
                return ignored(kind, IgnoreReason::SettingsUnavailable);
            }
        };
        if !settings.enabled {
            return ignored(kind, IgnoreReason::Disabled);
        }

        let today = local_date(self.clock.now(), self.offset);
        {
            let mut dispatch = self.dispatch.lock().await;
            match *dispatch {
                Some(Dispatch { day, phase }) if day == today => {
                    let reason = match phase {
                        Phase::InFlight => IgnoreReason::AttemptInFlight,
                        Phase::Succeeded => IgnoreReason::AlreadyCheckedIn,
                    };
                    return ignored(kind, reason);
                }
                _ => {}
            }

            let status = match self.backend.today_status().await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(error = %e, "today's attendance status unavailable");
                    return ignored(kind, IgnoreReason::StatusUnavailable);
                }
            };
            if status.has_checked_in {
                *dispatch = Some(Dispatch {
                    day: today,
                    phase: Phase::Succeeded,
                });
                return ignored(kind, IgnoreReason::AlreadyCheckedIn);
            }
            if status.has_checked_out {
                return ignored(kind, IgnoreReason::AlreadyCheckedOut);
            }
            if !settings.matches(&signal) {
                return ignored(kind, IgnoreReason::NoMatchingTrigger);
            }

            *dispatch = Some(Dispatch {
                day: today,
                phase: Phase::InFlight,
            });
        }

        self.state.lock().record_attempt(self.clock.now());
        tracing::info!(signal = kind, date = %today, "dispatching auto check-in");
        let result = self.backend.check_in(signal.location()).await;

        let mut dispatch = self.dispatch.lock().await;
        match result {
            Ok(attendance) => {
                *dispatch = Some(Dispatch {
                    day: today,
                    phase: Phase::Succeeded,
                });
                drop(dispatch);
                tracing::info!(date = %today, "auto check-in succeeded");
                if settings.notifications_enabled {
                    self.notifier
                        .notify("Checked in", "You were checked in automatically.");
                }
                CheckInOutcome::CheckedIn(attendance)
            }
            Err(e) => {
                // A later signal may try again; nothing retries on its own.
                if matches!(*dispatch, Some(d) if d.day == today && d.phase == Phase::InFlight) {
                    *dispatch = None;
                }
                drop(dispatch);
                tracing::warn!(error = %e, "auto check-in failed");
                self.notifier.notify(
                    "Automatic check-in failed",
                    "Please check in manually.",
                );
                CheckInOutcome::Failed(e)
            }
        }
    }
}

fn ignored(kind: &'static str, reason: IgnoreReason) -> CheckInOutcome {
    tracing::debug!(signal = kind, ?reason, "presence signal ignored");
    CheckInOutcome::Ignored(reason)
}

/// Feed every signal from `signals` to `engine`, each on its own task.
/// Ends when all senders are gone.
pub fn spawn_dispatcher<B>(
    engine: Arc<AutoCheckInEngine<B>>,
    mut signals: mpsc::UnboundedReceiver<PresenceSignal>,
) -> JoinHandle<()>
where
    B: AttendanceBackend + 'static,
{
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine.on_presence_signal(signal).await;
            });
        }
    })
}
