//! Scan configuration model
//!
//! `ScanConfig` is passed explicitly into ingestion rather than read from
//! ambient key/value storage, so core logic carries no hidden dependency on
//! the settings table.

use serde::{Deserialize, Serialize};

/// Placeholder used when no device name has been configured
pub const DEFAULT_DEVICE_NAME: &str = "unknown-device";

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow system preference
    #[default]
    System,
}

impl ThemeMode {
    /// Stable name used in the settings table
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// Parse a settings-table name, falling back to the default.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "light" => Self::Light,
            "dark" => Self::Dark,
            _ => Self::System,
        }
    }
}

/// Local device configuration consumed by scan ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Label stamped onto every scan captured on this device
    pub device_name: String,
    /// Play an audio cue after a successful capture
    pub audio_feedback: bool,
    /// Fire a haptic pulse after a successful capture
    pub haptic_feedback: bool,
    /// Theme preference
    pub theme: ThemeMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            audio_feedback: true,
            haptic_feedback: true,
            theme: ThemeMode::System,
        }
    }
}

impl ScanConfig {
    /// Device name with the placeholder substituted for blank values.
    #[must_use]
    pub fn effective_device_name(&self) -> &str {
        let trimmed = self.device_name.trim();
        if trimmed.is_empty() {
            DEFAULT_DEVICE_NAME
        } else {
            trimmed
        }
    }
}
