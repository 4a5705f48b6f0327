pub mod config;
pub mod daemon;
pub mod reminder;
pub mod settings;
