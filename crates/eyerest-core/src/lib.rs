//! # Eyerest Core Library
//!
//! This library provides the scheduling and state-reconciliation core of the
//! eyerest visual-rest reminder. Every `interval` minutes it fires a reminder
//! that opens a short break window, shows a desktop notification and plays a
//! chime. The CLI and the long-running daemon are thin layers over it.
//!
//! ## Architecture
//!
//! - **Engine**: A durable-state machine. Each entry point re-reads the stores,
//!   applies one transition and persists it before returning
//! - **Storage**: SQLite-backed settings and schedule-state records plus a
//!   TOML configuration file
//! - **Alarms**: Named periodic alarms kept in SQLite and delivered by a pump
//! - **Notify**: Best-effort desktop notification and chime playback
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: Start, stop, fire and reconcile the reminder loop
//! - [`RequestDispatcher`]: Named request/response boundary and wire codec
//! - [`Database`]: Durable store shared by settings, state and alarms
//! - [`Config`]: Application configuration management

pub mod alarm;
pub mod clock;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod notify;
pub mod settings;
pub mod storage;

pub use alarm::{AlarmPrimitive, AlarmPump, SqliteAlarms, REMINDER_ALARM};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Request, RequestDispatcher, Response};
pub use engine::{format_countdown, Phase, ReminderEngine, RunFlag, ScheduleState, StatePatch, Status};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, ReconcileOutcome};
pub use notify::{ChimePlayer, DesktopNotifier, LogNotifier, Notifier, ReminderNotice, SoundPlayer};
pub use settings::Settings;
pub use storage::{Config, Database, SharedDatabase};
