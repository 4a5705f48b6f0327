//! Host periodic-wake facility.
//!
//! The engine only needs create-or-replace, clear, and existence checks.
//! [`SqliteAlarms`] keeps alarms in the database so they outlive the process,
//! and [`AlarmPump`] turns due rows into named firings.

mod pump;
mod sqlite;

pub use pump::AlarmPump;
pub use sqlite::SqliteAlarms;

use std::time::Duration;

use crate::error::Result;

/// The one alarm driving the reminder loop.
pub const REMINDER_ALARM: &str = "reminder_loop";

/// Coarse, named, periodic alarms.
///
/// Firing is at least once per period, never exact.
pub trait AlarmPrimitive: Send + Sync {
    fn exists(&self, name: &str) -> Result<bool>;

    /// Create `name`, replacing any alarm already registered under it.
    fn schedule(&self, name: &str, initial_delay: Duration, period: Duration) -> Result<()>;

    /// Clear `name`. Clearing a missing alarm is not an error.
    fn cancel(&self, name: &str) -> Result<()>;
}
