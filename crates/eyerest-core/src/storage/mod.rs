mod config;
pub mod database;
mod schedule_state_store;
mod settings_store;

pub use config::{AlarmConfig, Config, LogConfig, NotificationsConfig, SoundConfig};
pub use database::{Database, SharedDatabase};
pub use schedule_state_store::ScheduleStateStore;
pub use settings_store::SettingsStore;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the eyerest data directory, creating it if needed.
///
/// `EYEREST_DATA_DIR` wins outright. Otherwise `~/.config/eyerest`, or
/// `~/.config/eyerest-dev` when `EYEREST_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("EYEREST_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("EYEREST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("eyerest-dev")
            } else {
                base_dir.join("eyerest")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
