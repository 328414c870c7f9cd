//! Database layer

pub mod connection;
pub mod migrations;
pub mod settings_repository;

pub use connection::Database;
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
