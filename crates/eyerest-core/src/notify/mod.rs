//! Best-effort side effects of a reminder firing.
//!
//! Both collaborators are fire-and-forget: they hand work off and return.
//! Errors they do return are logged by the engine and never undo the state
//! change that triggered them.

mod sound;

pub use sound::{ChimePlayer, PlaybackCommand, SoundPlayer, CHIME_ASSET};

use notify_rust::Notification;
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::Urgency;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::settings::Settings;

/// How loudly the host should present a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    High,
}

/// What a reminder notification says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub title: String,
    pub body: String,
    pub priority: Priority,
}

impl ReminderNotice {
    pub fn for_break(settings: &Settings) -> Self {
        Self {
            title: "Look away".into(),
            body: format!(
                "Take a {} second break! Look at something 20 feet away.",
                settings.break_seconds
            ),
            priority: Priority::High,
        }
    }
}

pub trait Notifier: Send + Sync {
    /// Ask the host to display `notice`. Must not block on the display.
    fn notify(&self, notice: &ReminderNotice) -> Result<()>;
}

/// Shows notices on the desktop through the platform notification service.
pub struct DesktopNotifier {
    app_name: String,
    icon: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            icon: icon.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: &ReminderNotice) -> Result<()> {
        let mut notification = Notification::new();
        notification
            .summary(&notice.title)
            .body(&notice.body)
            .appname(&self.app_name)
            .icon(&self.icon);
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(match notice.priority {
            Priority::Normal => Urgency::Normal,
            Priority::High => Urgency::Critical,
        });

        std::thread::Builder::new()
            .name("eyerest-notify".into())
            .spawn(move || {
                if let Err(e) = notification.show() {
                    warn!(error = %e, "desktop notification failed");
                }
            })
            .map_err(|e| CoreError::Notification(format!("cannot hand off notification: {e}")))?;
        Ok(())
    }
}

/// Writes notices to the log only. For headless hosts.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &ReminderNotice) -> Result<()> {
        info!(title = %notice.title, body = %notice.body, "reminder");
        Ok(())
    }
}
