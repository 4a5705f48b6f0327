//! Wires the core components together for one CLI process.

use std::sync::Arc;

use eyerest_core::notify::{DesktopNotifier, LogNotifier, Notifier};
use eyerest_core::{
    ChimePlayer, Config, Database, ReminderEngine, RequestDispatcher, SqliteAlarms, SystemClock,
};
use tracing::debug;

pub struct App {
    pub engine: Arc<ReminderEngine>,
    pub alarms: Arc<SqliteAlarms>,
    pub dispatcher: RequestDispatcher,
}

impl App {
    /// Open the database in the data directory and build the engine over it.
    pub fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?.into_shared();
        let alarms = Arc::new(SqliteAlarms::new(db.clone(), Arc::new(SystemClock)));

        let notifier: Arc<dyn Notifier> = if config.notifications.desktop {
            Arc::new(DesktopNotifier::new(
                config.notifications.app_name.clone(),
                config.notifications.icon.clone(),
            ))
        } else {
            Arc::new(LogNotifier)
        };
        let asset_dir = config.asset_dir()?;
        debug!(asset_dir = %asset_dir.display(), desktop = config.notifications.desktop, "building engine");
        let sound = Arc::new(ChimePlayer::new(asset_dir, config.sound.players.clone()));

        let engine = Arc::new(ReminderEngine::new(db, alarms.clone(), notifier, sound));
        Ok(Self {
            dispatcher: RequestDispatcher::new(engine.clone()),
            engine,
            alarms,
        })
    }

    /// Open and reconcile: every CLI invocation counts as a process start.
    pub async fn start(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let app = Self::open(config)?;
        app.engine.reconcile().await?;
        Ok(app)
    }
}
