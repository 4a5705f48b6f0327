use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::AlarmPrimitive;
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::database::{lock, AlarmRow, SharedDatabase, StoredAlarm};

/// Alarms persisted in the `alarms` table.
pub struct SqliteAlarms {
    db: SharedDatabase,
    clock: Arc<dyn Clock>,
}

impl SqliteAlarms {
    pub fn new(db: SharedDatabase, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Alarms due at the current clock reading, oldest first.
    ///
    /// Reading does not consume them: an alarm stays due until
    /// [`SqliteAlarms::acknowledge`] moves it on, so a failed delivery is
    /// retried on the next poll.
    ///
    /// # Errors
    /// Returns an error if the alarms table cannot be read.
    pub fn due(&self) -> Result<Vec<StoredAlarm>> {
        let now = self.clock.now_ms();
        Ok(lock(&self.db)?.alarms_due(now)?)
    }

    /// Mark a delivered alarm as handled.
    ///
    /// A periodic alarm moves a full period past now, so a late poll fires
    /// once rather than replaying missed periods. A zero-period alarm is
    /// one-shot and is removed. If the alarm was cleared or replaced while
    /// it was being delivered, it is left as it is.
    ///
    /// # Errors
    /// Returns an error if the alarms table cannot be updated.
    pub fn acknowledge(&self, alarm: &StoredAlarm) -> Result<()> {
        let now = self.clock.now_ms();
        let db = lock(&self.db)?;
        let moved = if alarm.period_ms == 0 {
            db.alarm_delete_at(&alarm.name, alarm.scheduled_at_ms)?
        } else {
            db.alarm_advance(&alarm.name, alarm.scheduled_at_ms, now + alarm.period_ms)?
        };
        debug!(
            alarm = %alarm.name,
            late_ms = now.saturating_sub(alarm.scheduled_at_ms),
            moved,
            "alarm acknowledged"
        );
        Ok(())
    }

    /// When `name` next fires, if it exists.
    ///
    /// # Errors
    /// Returns an error if the alarms table cannot be read.
    pub fn scheduled_at(&self, name: &str) -> Result<Option<u64>> {
        Ok(lock(&self.db)?
            .alarm_get(name)?
            .map(|alarm| alarm.scheduled_at_ms))
    }
}

impl AlarmPrimitive for SqliteAlarms {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(lock(&self.db)?.alarm_get(name)?.is_some())
    }

    fn schedule(&self, name: &str, initial_delay: Duration, period: Duration) -> Result<()> {
        let scheduled_at_ms = self.clock.now_ms() + initial_delay.as_millis() as u64;
        lock(&self.db)?.alarm_put(AlarmRow {
            name,
            scheduled_at_ms,
            period_ms: period.as_millis() as u64,
        })?;
        debug!(alarm = name, scheduled_at_ms, period_ms = period.as_millis() as u64, "alarm scheduled");
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        let removed = lock(&self.db)?.alarm_delete(name)?;
        debug!(alarm = name, removed, "alarm cleared");
        Ok(())
    }
}
