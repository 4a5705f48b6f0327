//! Durable user settings under the `settings` key.

use tracing::info;

use super::database::{lock, SharedDatabase};
use crate::error::{DatabaseError, Result};
use crate::settings::Settings;

pub const SETTINGS_KEY: &str = "settings";

#[derive(Clone)]
pub struct SettingsStore {
    db: SharedDatabase,
}

impl SettingsStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Persisted settings, writing the defaults on first access.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read, decoded or initialised.
    pub fn get(&self) -> Result<Settings> {
        let db = lock(&self.db)?;
        if let Some(json) = db.kv_get(SETTINGS_KEY)? {
            let settings = serde_json::from_str(&json).map_err(|e| DatabaseError::CorruptRecord {
                key: SETTINGS_KEY.into(),
                message: e.to_string(),
            })?;
            return Ok(settings);
        }
        let settings = Settings::default();
        db.kv_set(SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        info!("initialised default settings");
        Ok(settings)
    }

    /// Overwrite the record. No range checks happen here.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    pub fn set(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        lock(&self.db)?.kv_set(SETTINGS_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn store() -> SettingsStore {
        SettingsStore::new(Database::open_memory().unwrap().into_shared())
    }

    #[test]
    fn first_get_writes_defaults() {
        let store = store();
        assert!(lock(&store.db).unwrap().kv_get(SETTINGS_KEY).unwrap().is_none());
        assert_eq!(store.get().unwrap(), Settings::default());
        assert!(lock(&store.db).unwrap().kv_get(SETTINGS_KEY).unwrap().is_some());
    }

    #[test]
    fn set_overwrites_without_validation() {
        let store = store();
        let odd = Settings {
            interval_minutes: 500,
            break_seconds: 1,
            sound_enabled: false,
            notifications_enabled: false,
        };
        store.set(&odd).unwrap();
        assert_eq!(store.get().unwrap(), odd);
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let store = store();
        lock(&store.db).unwrap().kv_set(SETTINGS_KEY, "not json").unwrap();
        assert!(store.get().is_err());
    }
}
