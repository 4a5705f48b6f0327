//! Reminder engine implementation.
//!
//! A durable-state machine. The stores are the only source of truth: every
//! entry point re-reads them, applies one transition and writes them back.
//! The only in-memory state is the gate that serializes transitions and the
//! event broadcaster.
//!
//! ## State Transitions
//!
//! ```text
//! Paused <-> Running { Waiting | BreakActive }
//! ```
//!
//! `BreakActive` is not stored; it is `breakActiveUntil > now`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::state::{StatePatch, Status};
use crate::alarm::{AlarmPrimitive, REMINDER_ALARM};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::events::{Event, ReconcileOutcome};
use crate::notify::{Notifier, ReminderNotice, SoundPlayer};
use crate::settings::Settings;
use crate::storage::{ScheduleStateStore, SettingsStore, SharedDatabase};

const EVENT_CAPACITY: usize = 64;

pub struct ReminderEngine {
    settings: SettingsStore,
    state: ScheduleStateStore,
    alarms: Arc<dyn AlarmPrimitive>,
    notifier: Arc<dyn Notifier>,
    sound: Arc<dyn SoundPlayer>,
    clock: Arc<dyn Clock>,
    /// Serializes every read-modify-write of the schedule state.
    gate: Mutex<()>,
    events: broadcast::Sender<Event>,
}

impl ReminderEngine {
    pub fn new(
        db: SharedDatabase,
        alarms: Arc<dyn AlarmPrimitive>,
        notifier: Arc<dyn Notifier>,
        sound: Arc<dyn SoundPlayer>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings: SettingsStore::new(db.clone()),
            state: ScheduleStateStore::new(db),
            alarms,
            notifier,
            sound,
            clock: Arc::new(SystemClock),
            gate: Mutex::new(()),
            events,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Resolve the stored running flag against the alarm's real existence.
    ///
    /// Run once per process start. Intended-running with a missing alarm is
    /// repaired by starting the loop again; a paused loop is left alone.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<Event> {
        let _gate = self.gate.lock().await;
        let settings = self.settings.get()?;
        let state = self.state.read()?;

        let outcome = if !state.run_flag().is_active() {
            ReconcileOutcome::Paused
        } else if self.alarms.exists(REMINDER_ALARM)? {
            ReconcileOutcome::AlreadyScheduled
        } else {
            info!(flag = ?state.run_flag(), "reminder alarm missing; restarting loop");
            self.start_locked(settings.interval_minutes)?;
            ReconcileOutcome::Repaired
        };

        info!(?outcome, "reconciled schedule state");
        Ok(self.publish(Event::Reconciled {
            outcome,
            at: self.stamp(),
        }))
    }

    /// (Re)start the loop with the given interval. Safe while running.
    pub async fn start(&self, interval_minutes: u32) -> Result<Event> {
        let _gate = self.gate.lock().await;
        self.start_locked(interval_minutes)
    }

    pub async fn stop(&self) -> Result<Event> {
        let _gate = self.gate.lock().await;
        self.stop_locked()
    }

    /// Flip running based on the stored flag as of now, then report status.
    pub async fn toggle(&self) -> Result<Status> {
        let _gate = self.gate.lock().await;
        let state = self.state.read()?;
        if state.run_flag().is_active() {
            self.stop_locked()?;
        } else {
            let settings = self.settings.get()?;
            self.start_locked(settings.interval_minutes)?;
        }
        self.status_locked()
    }

    /// Handle a named alarm firing.
    ///
    /// Returns `None` for alarms this engine does not own. A reminder alarm
    /// firing while the loop is paused is stale: it is cleared and nothing
    /// else changes.
    pub async fn on_alarm(&self, name: &str) -> Result<Option<Event>> {
        if name != REMINDER_ALARM {
            debug!(alarm = name, "ignoring unknown alarm");
            return Ok(None);
        }

        let _gate = self.gate.lock().await;
        let state = self.state.read()?;
        if !state.run_flag().is_active() {
            warn!(alarm = name, "alarm fired while paused; clearing it");
            self.alarms.cancel(REMINDER_ALARM)?;
            return Ok(Some(self.publish(Event::ReminderSkipped {
                alarm: name.to_string(),
                at: self.stamp(),
            })));
        }

        self.fire_locked(true).map(Some)
    }

    /// Fire a reminder now, whatever the state. The alarm is not touched.
    pub async fn test_trigger(&self) -> Result<Event> {
        let _gate = self.gate.lock().await;
        self.fire_locked(false)
    }

    /// Persist new settings; a running loop restarts its countdown from now.
    pub async fn update_settings(&self, settings: Settings) -> Result<Event> {
        let _gate = self.gate.lock().await;
        self.settings.set(&settings)?;

        let rescheduled = self.state.read()?.run_flag().is_active();
        if rescheduled {
            self.start_locked(settings.interval_minutes)?;
        }

        info!(
            interval_minutes = settings.interval_minutes,
            break_seconds = settings.break_seconds,
            rescheduled,
            "settings updated"
        );
        Ok(self.publish(Event::SettingsUpdated {
            interval_minutes: settings.interval_minutes,
            break_seconds: settings.break_seconds,
            rescheduled,
            at: self.stamp(),
        }))
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current status, read fresh from the stores.
    pub async fn status(&self) -> Result<Status> {
        let _gate = self.gate.lock().await;
        self.status_locked()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // ── Internal (caller holds the gate) ────────────────────────────

    fn start_locked(&self, interval_minutes: u32) -> Result<Event> {
        let period = Duration::from_secs(u64::from(interval_minutes) * 60);
        self.alarms.cancel(REMINDER_ALARM)?;
        self.alarms.schedule(REMINDER_ALARM, period, period)?;

        let next_trigger_at = self.clock.now_ms() + period.as_millis() as u64;
        self.state.write(&StatePatch::started(next_trigger_at))?;

        info!(interval_minutes, next_trigger_at, "reminder loop started");
        Ok(self.publish(Event::LoopStarted {
            interval_minutes,
            next_trigger_at,
            at: self.stamp(),
        }))
    }

    fn stop_locked(&self) -> Result<Event> {
        self.alarms.cancel(REMINDER_ALARM)?;
        self.state.write(&StatePatch::stopped())?;

        info!("reminder loop stopped");
        Ok(self.publish(Event::LoopStopped { at: self.stamp() }))
    }

    fn fire_locked(&self, scheduled: bool) -> Result<Event> {
        let settings = self.settings.get()?;
        let running = self.state.read()?.run_flag().is_active();
        let now = self.clock.now_ms();
        let next_trigger_at = now + settings.interval_ms();
        let break_active_until = now + settings.break_ms();

        // A paused loop keeps `nextTriggerAt` null; only the break is shown.
        let mut patch = StatePatch::fired(next_trigger_at, break_active_until);
        if !running {
            patch.next_trigger_at = None;
        }
        let state = self.state.write(&patch)?;

        info!(
            scheduled,
            next_trigger_at = ?state.next_trigger_at,
            break_active_until,
            "reminder fired"
        );

        // State is committed; nothing below may fail the transition.
        self.dispatch_side_effects(&settings);

        Ok(self.publish(Event::ReminderFired {
            next_trigger_at: state.next_trigger_at,
            break_active_until,
            scheduled,
            at: self.stamp(),
        }))
    }

    fn dispatch_side_effects(&self, settings: &Settings) {
        if settings.notifications_enabled {
            if let Err(e) = self.notifier.notify(&ReminderNotice::for_break(settings)) {
                warn!(error = %e, "notification failed");
            }
        }
        if settings.sound_enabled {
            if let Err(e) = self.sound.play_chime() {
                warn!(error = %e, "chime playback failed");
            }
        }
    }

    fn status_locked(&self) -> Result<Status> {
        let settings = self.settings.get()?;
        let state = self.state.read()?;
        Ok(Status::from_records(&state, settings))
    }

    fn publish(&self, event: Event) -> Event {
        // No subscribers is fine.
        let _ = self.events.send(event.clone());
        event
    }

    fn stamp(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.now_ms() as i64).unwrap_or_else(Utc::now)
    }
}
