//! Settings repository implementation

use crate::db::Database;
use crate::error::Result;
use crate::models::{ScanConfig, ThemeMode};

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load the scan configuration from the database
    async fn load(&self) -> Result<ScanConfig>;

    /// Save the scan configuration to the database
    async fn save(&self, config: &ScanConfig) -> Result<()>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given database
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.conn().await;
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            [key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.conn().await;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    async fn load(&self) -> Result<ScanConfig> {
        let mut config = ScanConfig::default();

        if let Some(value) = self.get_setting("device_name").await? {
            if !value.trim().is_empty() {
                config.device_name = value;
            }
        }

        if let Some(value) = self.get_setting("audio_feedback").await? {
            config.audio_feedback = parse_flag(&value);
        }

        if let Some(value) = self.get_setting("haptic_feedback").await? {
            config.haptic_feedback = parse_flag(&value);
        }

        if let Some(value) = self.get_setting("theme").await? {
            config.theme = ThemeMode::from_name(&value);
        }

        Ok(config)
    }

    async fn save(&self, config: &ScanConfig) -> Result<()> {
        self.set_setting("device_name", &config.device_name).await?;
        self.set_setting(
            "audio_feedback",
            if config.audio_feedback { "true" } else { "false" },
        )
        .await?;
        self.set_setting(
            "haptic_feedback",
            if config.haptic_feedback { "true" } else { "false" },
        )
        .await?;
        self.set_setting("theme", config.theme.as_str()).await?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
