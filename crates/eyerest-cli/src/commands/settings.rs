use clap::{Subcommand, ValueEnum};
use eyerest_core::{Config, Request, Settings};

use crate::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::On
    }
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print reminder settings as JSON
    Show,
    /// Change reminder settings; omitted options keep their current value
    Set {
        /// Minutes between reminders (1-120)
        #[arg(long)]
        interval: Option<u32>,
        /// Break length in seconds (5-120)
        #[arg(long = "break")]
        break_seconds: Option<u32>,
        /// Play a chime with each reminder
        #[arg(long)]
        sound: Option<Toggle>,
        /// Show a desktop notification with each reminder
        #[arg(long)]
        notifications: Option<Toggle>,
    },
}

pub async fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::start(&Config::load()?).await?;
    let current = app.engine.status().await?.settings;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        SettingsAction::Set {
            interval,
            break_seconds,
            sound,
            notifications,
        } => {
            let updated = merge(current, interval, break_seconds, sound, notifications);
            updated.validate()?;
            app.dispatcher
                .dispatch(Request::UpdateSettings { settings: updated })
                .await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}

fn merge(
    current: Settings,
    interval: Option<u32>,
    break_seconds: Option<u32>,
    sound: Option<Toggle>,
    notifications: Option<Toggle>,
) -> Settings {
    Settings {
        interval_minutes: interval.unwrap_or(current.interval_minutes),
        break_seconds: break_seconds.unwrap_or(current.break_seconds),
        sound_enabled: sound.map_or(current.sound_enabled, bool::from),
        notifications_enabled: notifications.map_or(current.notifications_enabled, bool::from),
    }
}
