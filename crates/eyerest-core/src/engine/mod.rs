mod reminder;
mod state;

pub use reminder::ReminderEngine;
pub use state::{format_countdown, Phase, RunFlag, ScheduleState, StatePatch, Status};
