//! Data models

pub mod scan;
pub mod settings;

pub use scan::{NewScan, Scan, ScanId};
pub use settings::{ScanConfig, ThemeMode, DEFAULT_DEVICE_NAME};
