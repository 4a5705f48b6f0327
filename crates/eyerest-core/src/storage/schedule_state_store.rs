//! Durable runtime state under the `runtimeState` key.

use super::database::{lock, SharedDatabase};
use crate::engine::{ScheduleState, StatePatch};
use crate::error::{DatabaseError, Result};

pub const RUNTIME_STATE_KEY: &str = "runtimeState";

#[derive(Clone)]
pub struct ScheduleStateStore {
    db: SharedDatabase,
}

impl ScheduleStateStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Raw read. A missing record reads as all fields absent.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or decoded.
    pub fn read(&self) -> Result<ScheduleState> {
        let db = lock(&self.db)?;
        match db.kv_get(RUNTIME_STATE_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json).map_err(|e| {
                DatabaseError::CorruptRecord {
                    key: RUNTIME_STATE_KEY.into(),
                    message: e.to_string(),
                }
            })?),
            None => Ok(ScheduleState::default()),
        }
    }

    /// Merge `patch` into the stored record and persist it.
    ///
    /// Read and write happen under one connection lock, so a concurrent
    /// writer in this process cannot slip in between.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read, decoded or written.
    pub fn write(&self, patch: &StatePatch) -> Result<ScheduleState> {
        let db = lock(&self.db)?;
        let mut state = match db.kv_get(RUNTIME_STATE_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| DatabaseError::CorruptRecord {
                key: RUNTIME_STATE_KEY.into(),
                message: e.to_string(),
            })?,
            None => ScheduleState::default(),
        };
        state.merge(patch);
        db.kv_set(RUNTIME_STATE_KEY, &serde_json::to_string(&state)?)?;
        Ok(state)
    }
}
