//! Delivers due alarms to the engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::SqliteAlarms;
use crate::engine::ReminderEngine;
use crate::error::Result;

/// Shortest allowed gap between polls.
const MIN_POLL: Duration = Duration::from_secs(1);

pub struct AlarmPump {
    alarms: Arc<SqliteAlarms>,
    engine: Arc<ReminderEngine>,
    poll: Duration,
}

impl AlarmPump {
    pub fn new(alarms: Arc<SqliteAlarms>, engine: Arc<ReminderEngine>, poll: Duration) -> Self {
        Self {
            alarms,
            engine,
            poll: poll.max(MIN_POLL),
        }
    }

    /// Fire every alarm due right now. Returns how many were delivered.
    ///
    /// An alarm is acknowledged only after the engine has handled it. A
    /// failing delivery is logged, leaves its alarm due for the next poll and
    /// does not stop the others.
    ///
    /// # Errors
    /// Returns an error only if the alarms table itself cannot be read.
    pub async fn poll_once(&self) -> Result<usize> {
        let due = self.alarms.due()?;
        let mut delivered = 0;
        for alarm in due {
            if let Err(e) = self.engine.on_alarm(&alarm.name).await {
                error!(alarm = %alarm.name, error = %e, "alarm delivery failed; will retry");
                continue;
            }
            delivered += 1;
            if let Err(e) = self.alarms.acknowledge(&alarm) {
                warn!(alarm = %alarm.name, error = %e, "failed to re-arm delivered alarm");
            }
        }
        Ok(delivered)
    }

    /// Poll until `shutdown_rx` turns true.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(poll_secs = self.poll.as_secs(), "alarm pump starting");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "failed to read due alarms");
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        // Sender dropped; treat as shutdown.
                        break;
                    }
                }
                _ = sleep(self.poll) => {}
            }
        }

        info!("alarm pump stopped");
    }
}
