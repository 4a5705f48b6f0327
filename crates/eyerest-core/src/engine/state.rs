//! Durable schedule state and the status projection built from it.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// The `runtimeState` record exactly as stored.
///
/// Missing fields stay missing; [`ScheduleState::run_flag`] is the only place
/// that interprets an absent `running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(default)]
    pub next_trigger_at: Option<u64>,
    #[serde(default)]
    pub break_active_until: Option<u64>,
}

/// Stored running flag, absence included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFlag {
    /// Never written: a fresh install or a wiped record.
    Unset,
    Active,
    Paused,
}

impl RunFlag {
    /// Absence resolves to active: the loop is on unless explicitly paused.
    pub fn is_active(self) -> bool {
        !matches!(self, RunFlag::Paused)
    }
}

impl ScheduleState {
    pub fn run_flag(&self) -> RunFlag {
        match self.running {
            None => RunFlag::Unset,
            Some(true) => RunFlag::Active,
            Some(false) => RunFlag::Paused,
        }
    }

    /// Apply a partial write. Fields the patch does not mention are kept.
    pub fn merge(&mut self, patch: &StatePatch) {
        if let Some(running) = patch.running {
            self.running = Some(running);
        }
        if let Some(next) = patch.next_trigger_at {
            self.next_trigger_at = next;
        }
        if let Some(until) = patch.break_active_until {
            self.break_active_until = until;
        }
    }
}

/// A partial update to [`ScheduleState`].
///
/// The outer `Option` says whether the field is written; the inner one is the
/// nullable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub running: Option<bool>,
    pub next_trigger_at: Option<Option<u64>>,
    pub break_active_until: Option<Option<u64>>,
}

impl StatePatch {
    pub fn started(next_trigger_at: u64) -> Self {
        Self {
            running: Some(true),
            next_trigger_at: Some(Some(next_trigger_at)),
            break_active_until: None,
        }
    }

    pub fn stopped() -> Self {
        Self {
            running: Some(false),
            next_trigger_at: Some(None),
            break_active_until: None,
        }
    }

    pub fn fired(next_trigger_at: u64, break_active_until: u64) -> Self {
        Self {
            running: None,
            next_trigger_at: Some(Some(next_trigger_at)),
            break_active_until: Some(Some(break_active_until)),
        }
    }
}

/// Status payload returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub running: bool,
    pub settings: Settings,
    pub next_trigger_at: Option<u64>,
    pub break_active_until: Option<u64>,
}

/// What a status looks like at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BreakActive { remaining_ms: u64, total_ms: u64 },
    Waiting { remaining_ms: u64, total_ms: u64 },
    /// Running, but no trigger time has been recorded yet.
    Pending,
    Paused,
}

impl Status {
    pub fn from_records(state: &ScheduleState, settings: Settings) -> Self {
        Self {
            running: state.run_flag().is_active(),
            settings,
            next_trigger_at: state.next_trigger_at,
            break_active_until: state.break_active_until,
        }
    }

    /// A break in progress wins over the countdown, even while paused.
    pub fn phase(&self, now_ms: u64) -> Phase {
        if let Some(until) = self.break_active_until {
            if until > now_ms {
                return Phase::BreakActive {
                    remaining_ms: until - now_ms,
                    total_ms: self.settings.break_ms(),
                };
            }
        }
        if !self.running {
            return Phase::Paused;
        }
        match self.next_trigger_at {
            Some(next) => Phase::Waiting {
                remaining_ms: next.saturating_sub(now_ms),
                total_ms: self.settings.interval_ms(),
            },
            None => Phase::Pending,
        }
    }
}

impl Phase {
    /// Remaining share of the current window, 0.0 ..= 100.0.
    pub fn remaining_pct(&self) -> f64 {
        match *self {
            Phase::BreakActive { remaining_ms, total_ms }
            | Phase::Waiting { remaining_ms, total_ms } => {
                if total_ms == 0 {
                    return 0.0;
                }
                (remaining_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
            }
            Phase::Pending | Phase::Paused => 0.0,
        }
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        match *self {
            Phase::BreakActive { remaining_ms, .. } | Phase::Waiting { remaining_ms, .. } => {
                Some(remaining_ms)
            }
            Phase::Pending | Phase::Paused => None,
        }
    }
}

/// `mm:ss`, rounding partial seconds up so a countdown never shows 00:00 early.
pub fn format_countdown(ms: u64) -> String {
    let total_secs = ms.div_ceil(1_000);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
