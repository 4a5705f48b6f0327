use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a process-start reconciliation decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Intended running, alarm missing: the loop was started again.
    Repaired,
    /// Intended running, alarm present: nothing to do.
    AlreadyScheduled,
    /// Explicitly paused: nothing to do.
    Paused,
}

/// Every state change in the engine produces an Event.
/// The daemon prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    LoopStarted {
        interval_minutes: u32,
        next_trigger_at: u64,
        at: DateTime<Utc>,
    },
    LoopStopped {
        at: DateTime<Utc>,
    },
    ReminderFired {
        /// Null when fired on demand while paused.
        next_trigger_at: Option<u64>,
        break_active_until: u64,
        /// False when fired on demand rather than by the alarm.
        scheduled: bool,
        at: DateTime<Utc>,
    },
    /// An alarm fired while the loop is paused and was discarded.
    ReminderSkipped {
        alarm: String,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        interval_minutes: u32,
        break_seconds: u32,
        rescheduled: bool,
        at: DateTime<Utc>,
    },
    Reconciled {
        outcome: ReconcileOutcome,
        at: DateTime<Utc>,
    },
}
