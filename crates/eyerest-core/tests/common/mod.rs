//! Shared fixtures for eyerest-core integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eyerest_core::error::{CoreError, Result};
use eyerest_core::{
    AlarmPrimitive, Clock, Database, ManualClock, Notifier, ReminderEngine, ReminderNotice,
    SharedDatabase, SoundPlayer, SqliteAlarms,
};

pub const T0: u64 = 1_700_000_000_000;
pub const MINUTE_MS: u64 = 60_000;

// ============================================================================
// Alarm double
// ============================================================================

/// In-memory alarms that count every call made against them.
#[derive(Default)]
pub struct RecordingAlarms {
    alarms: Mutex<HashMap<String, (Duration, Duration)>>,
    pub exists_calls: AtomicUsize,
    pub schedule_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl RecordingAlarms {
    pub fn period(&self, name: &str) -> Option<Duration> {
        self.alarms.lock().unwrap().get(name).map(|(_, period)| *period)
    }

    pub fn remove(&self, name: &str) {
        self.alarms.lock().unwrap().remove(name);
    }

    /// `(exists, schedule, cancel)` call counts.
    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.exists_calls.load(Ordering::SeqCst),
            self.schedule_calls.load(Ordering::SeqCst),
            self.cancel_calls.load(Ordering::SeqCst),
        )
    }
}

impl AlarmPrimitive for RecordingAlarms {
    fn exists(&self, name: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.alarms.lock().unwrap().contains_key(name))
    }

    fn schedule(&self, name: &str, initial_delay: Duration, period: Duration) -> Result<()> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        self.alarms
            .lock()
            .unwrap()
            .insert(name.to_string(), (initial_delay, period));
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.alarms.lock().unwrap().remove(name);
        Ok(())
    }
}

// ============================================================================
// Side-effect doubles
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<ReminderNotice>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &ReminderNotice) -> Result<()> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSound {
    pub plays: AtomicUsize,
}

impl RecordingSound {
    pub fn count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl SoundPlayer for RecordingSound {
    fn play_chime(&self) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notice: &ReminderNotice) -> Result<()> {
        Err(CoreError::Notification("no notification service".into()))
    }
}

pub struct FailingSound;

impl SoundPlayer for FailingSound {
    fn play_chime(&self) -> Result<()> {
        Err(CoreError::Playback("no audio device".into()))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub db: SharedDatabase,
    pub engine: Arc<ReminderEngine>,
    pub alarms: Arc<RecordingAlarms>,
    pub notifier: Arc<RecordingNotifier>,
    pub sound: Arc<RecordingSound>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Engine over an in-memory database with recording doubles, clock at T0.
    pub fn new() -> Self {
        let db = Database::open_memory().unwrap().into_shared();
        Self::with_db(db)
    }

    pub fn with_db(db: SharedDatabase) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let alarms = Arc::new(RecordingAlarms::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let sound = Arc::new(RecordingSound::default());
        let engine = ReminderEngine::new(db.clone(), alarms.clone(), notifier.clone(), sound.clone())
            .with_clock(clock.clone());
        Self {
            db,
            engine: Arc::new(engine),
            alarms,
            notifier,
            sound,
            clock,
        }
    }
}

/// Engine backed by a database file, with real SQLite alarms.
///
/// Building two of these over the same path models a process restart.
pub fn file_engine(path: &Path, clock: Arc<ManualClock>) -> (Arc<ReminderEngine>, Arc<SqliteAlarms>) {
    let db = Database::open_at(path).unwrap().into_shared();
    let clock: Arc<dyn Clock> = clock;
    let alarms = Arc::new(SqliteAlarms::new(db.clone(), clock.clone()));
    let engine = ReminderEngine::new(
        db,
        alarms.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingSound::default()),
    )
    .with_clock(clock);
    (Arc::new(engine), alarms)
}
