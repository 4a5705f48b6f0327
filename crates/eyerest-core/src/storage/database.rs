//! SQLite-backed durable storage.
//!
//! Provides persistent storage for:
//! - Key-value records (`settings`, `runtimeState`)
//! - Named host alarms driving the reminder loop

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::error::{DatabaseError, Result};

/// How long a writer waits for another process holding the file lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection shared by the stores and the alarm facility.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// A persisted alarm row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmRow<'a> {
    pub name: &'a str,
    pub scheduled_at_ms: u64,
    pub period_ms: u64,
}

/// Owned form of [`AlarmRow`] returned from queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAlarm {
    pub name: String,
    pub scheduled_at_ms: u64,
    pub period_ms: u64,
}

/// SQLite database holding every durable eyerest record.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/eyerest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("eyerest.db"))
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS alarms (
                    name            TEXT PRIMARY KEY,
                    scheduled_at_ms INTEGER NOT NULL,
                    period_ms       INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_alarms_scheduled_at ON alarms(scheduled_at_ms);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn alarm_get(&self, name: &str) -> Result<Option<StoredAlarm>, DatabaseError> {
        let alarm = self
            .conn
            .query_row(
                "SELECT name, scheduled_at_ms, period_ms FROM alarms WHERE name = ?1",
                params![name],
                map_alarm,
            )
            .optional()?;
        Ok(alarm)
    }

    /// Insert or replace an alarm by name.
    pub fn alarm_put(&self, alarm: AlarmRow<'_>) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO alarms (name, scheduled_at_ms, period_ms)
             VALUES (?1, ?2, ?3)",
            params![
                alarm.name,
                alarm.scheduled_at_ms as i64,
                alarm.period_ms as i64
            ],
        )?;
        Ok(())
    }

    /// Delete an alarm. Returns whether a row was removed.
    pub fn alarm_delete(&self, name: &str) -> Result<bool, DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])?;
        Ok(n > 0)
    }

    /// Move an alarm from `from_ms` to `to_ms`.
    ///
    /// Does nothing if the row was cleared or rescheduled since it was read.
    /// Returns whether a row was moved.
    pub fn alarm_advance(&self, name: &str, from_ms: u64, to_ms: u64) -> Result<bool, DatabaseError> {
        let n = self.conn.execute(
            "UPDATE alarms SET scheduled_at_ms = ?3 WHERE name = ?1 AND scheduled_at_ms = ?2",
            params![name, from_ms as i64, to_ms as i64],
        )?;
        Ok(n > 0)
    }

    /// Delete an alarm only if it is still scheduled at `at_ms`.
    pub fn alarm_delete_at(&self, name: &str, at_ms: u64) -> Result<bool, DatabaseError> {
        let n = self.conn.execute(
            "DELETE FROM alarms WHERE name = ?1 AND scheduled_at_ms = ?2",
            params![name, at_ms as i64],
        )?;
        Ok(n > 0)
    }

    /// Alarms whose scheduled time is at or before `now_ms`, oldest first.
    pub fn alarms_due(&self, now_ms: u64) -> Result<Vec<StoredAlarm>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, scheduled_at_ms, period_ms FROM alarms
             WHERE scheduled_at_ms <= ?1
             ORDER BY scheduled_at_ms",
        )?;
        let rows = stmt.query_map(params![now_ms as i64], map_alarm)?;
        let mut due = Vec::new();
        for row in rows {
            due.push(row?);
        }
        Ok(due)
    }
}

fn map_alarm(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredAlarm> {
    Ok(StoredAlarm {
        name: row.get(0)?,
        scheduled_at_ms: row.get::<_, i64>(1)? as u64,
        period_ms: row.get::<_, i64>(2)? as u64,
    })
}

/// Lock a shared database, mapping poisoning to [`DatabaseError::Poisoned`].
pub fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>, DatabaseError> {
    db.lock().map_err(|_| DatabaseError::Poisoned)
}
