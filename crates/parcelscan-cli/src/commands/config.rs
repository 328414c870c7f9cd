//! Device configuration stored in the local settings table.

use parcelscan_core::db::{SettingsRepository, SqliteSettingsRepository};

use crate::cli::ConfigAction;
use crate::commands::common::AnyStore;
use crate::error::CliError;

pub async fn config(store: &AnyStore, action: ConfigAction) -> Result<(), CliError> {
    let Some(db) = store.local_database() else {
        return Err(CliError::Config(
            "configuration lives in the local database; not available in remote-only mode"
                .to_string(),
        ));
    };
    let repo = SqliteSettingsRepository::new(db);
    let mut config = repo.load().await?;

    match action {
        ConfigAction::Get => {
            println!("device-name: {}", config.effective_device_name());
            println!("audio:       {}", config.audio_feedback);
            println!("haptic:      {}", config.haptic_feedback);
            println!("theme:       {}", config.theme.as_str());
            return Ok(());
        }
        ConfigAction::DeviceName { name } => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(CliError::Config("device name cannot be blank".to_string()));
            }
            config.device_name = trimmed.to_string();
        }
        ConfigAction::Audio { enabled } => config.audio_feedback = enabled,
        ConfigAction::Haptic { enabled } => config.haptic_feedback = enabled,
    }

    repo.save(&config).await?;
    println!("Saved");
    Ok(())
}
