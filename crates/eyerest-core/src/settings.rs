//! User-editable reminder settings.
//!
//! Stored as camelCase JSON under the `settings` key. Range checks live in
//! [`Settings::validate`] and are the settings-entry side's responsibility;
//! the store writes whatever it is given.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const INTERVAL_MINUTES_RANGE: RangeInclusive<u32> = 1..=120;
pub const BREAK_SECONDS_RANGE: RangeInclusive<u32> = 5..=120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_break_seconds")]
    pub break_seconds: u32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_interval_minutes() -> u32 {
    10
}
fn default_break_seconds() -> u32 {
    20
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            break_seconds: default_break_seconds(),
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    pub fn interval_ms(&self) -> u64 {
        u64::from(self.interval_minutes) * 60_000
    }

    pub fn break_ms(&self) -> u64 {
        u64::from(self.break_seconds) * 1_000
    }

    /// Check the documented ranges, reporting the first violation.
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfRange`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !INTERVAL_MINUTES_RANGE.contains(&self.interval_minutes) {
            return Err(ValidationError::OutOfRange {
                field: "intervalMinutes".into(),
                message: format!(
                    "Interval must be between {} and {} minutes.",
                    INTERVAL_MINUTES_RANGE.start(),
                    INTERVAL_MINUTES_RANGE.end()
                ),
            });
        }
        if !BREAK_SECONDS_RANGE.contains(&self.break_seconds) {
            return Err(ValidationError::OutOfRange {
                field: "breakSeconds".into(),
                message: format!(
                    "Break must be between {} and {} seconds.",
                    BREAK_SECONDS_RANGE.start(),
                    BREAK_SECONDS_RANGE.end()
                ),
            });
        }
        Ok(())
    }
}
