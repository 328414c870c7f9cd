//! Shared helpers: store selection, config loading, output formatting.

use std::path::Path;

use chrono::{Local, TimeZone};
use parcelscan_core::db::{SettingsRepository, SqliteSettingsRepository};
use parcelscan_core::remote::RemoteClient;
use parcelscan_core::store::{RemoteStore, ReplicatedStore, ScanStore, SqliteStore};
use parcelscan_core::{NewScan, Result as CoreResult, Scan, ScanConfig, ScanId};
use serde::Serialize;

use crate::error::CliError;

/// Deployment mode chosen at startup from CLI flags. The modes are mutually
/// exclusive; there is no runtime switch between them.
pub enum StoreMode {
    Local,
    Replicated(String),
    RemoteOnly(String),
}

impl StoreMode {
    pub fn from_flags(remote: Option<String>, mirror: Option<String>) -> Self {
        match (remote, mirror) {
            (Some(url), _) => Self::RemoteOnly(url),
            (None, Some(url)) => Self::Replicated(url),
            (None, None) => Self::Local,
        }
    }
}

/// One store per invocation, picked by deployment mode.
pub enum AnyStore {
    Local(SqliteStore),
    Replicated(ReplicatedStore),
    Remote(RemoteStore),
}

impl AnyStore {
    pub fn open(mode: StoreMode, db_path: &Path) -> Result<Self, CliError> {
        match mode {
            StoreMode::Local => Ok(Self::Local(SqliteStore::open(db_path)?)),
            StoreMode::Replicated(url) => {
                let local = SqliteStore::open(db_path)?;
                let remote = RemoteClient::new(url)?;
                Ok(Self::Replicated(ReplicatedStore::new(local, remote)))
            }
            StoreMode::RemoteOnly(url) => Ok(Self::Remote(RemoteStore::new(RemoteClient::new(
                url,
            )?))),
        }
    }

    /// The local settings database, absent in remote-only mode.
    pub const fn local_database(&self) -> Option<&parcelscan_core::db::Database> {
        match self {
            Self::Local(store) => Some(store.database()),
            Self::Replicated(store) => Some(store.local().database()),
            Self::Remote(_) => None,
        }
    }

    /// Load the scan configuration. Remote-only mode has no local settings
    /// table and falls back to defaults.
    pub async fn load_config(&self) -> Result<ScanConfig, CliError> {
        match self.local_database() {
            Some(db) => Ok(SqliteSettingsRepository::new(db).load().await?),
            None => Ok(ScanConfig::default()),
        }
    }
}

impl ScanStore for AnyStore {
    async fn insert(&self, scan: NewScan) -> CoreResult<Scan> {
        match self {
            Self::Local(s) => s.insert(scan).await,
            Self::Replicated(s) => s.insert(scan).await,
            Self::Remote(s) => s.insert(scan).await,
        }
    }

    async fn get_all(&self) -> CoreResult<Vec<Scan>> {
        match self {
            Self::Local(s) => s.get_all().await,
            Self::Replicated(s) => s.get_all().await,
            Self::Remote(s) => s.get_all().await,
        }
    }

    async fn get_by_tracking_exact(&self, code: &str) -> CoreResult<Option<Scan>> {
        match self {
            Self::Local(s) => s.get_by_tracking_exact(code).await,
            Self::Replicated(s) => s.get_by_tracking_exact(code).await,
            Self::Remote(s) => s.get_by_tracking_exact(code).await,
        }
    }

    async fn search(&self, normalized: &str, limit: usize) -> CoreResult<Vec<Scan>> {
        match self {
            Self::Local(s) => s.search(normalized, limit).await,
            Self::Replicated(s) => s.search(normalized, limit).await,
            Self::Remote(s) => s.search(normalized, limit).await,
        }
    }

    async fn find_same_day(&self, normalized: &str, timestamp_ms: i64) -> CoreResult<Option<Scan>> {
        match self {
            Self::Local(s) => s.find_same_day(normalized, timestamp_ms).await,
            Self::Replicated(s) => s.find_same_day(normalized, timestamp_ms).await,
            Self::Remote(s) => s.find_same_day(normalized, timestamp_ms).await,
        }
    }

    async fn update_checked(&self, id: &ScanId, checked: bool) -> CoreResult<usize> {
        match self {
            Self::Local(s) => s.update_checked(id, checked).await,
            Self::Replicated(s) => s.update_checked(id, checked).await,
            Self::Remote(s) => s.update_checked(id, checked).await,
        }
    }

    async fn delete_many(&self, ids: &[ScanId]) -> CoreResult<usize> {
        match self {
            Self::Local(s) => s.delete_many(ids).await,
            Self::Replicated(s) => s.delete_many(ids).await,
            Self::Remote(s) => s.delete_many(ids).await,
        }
    }

    async fn count(&self) -> CoreResult<usize> {
        match self {
            Self::Local(s) => s.count().await,
            Self::Replicated(s) => s.count().await,
            Self::Remote(s) => s.count().await,
        }
    }

    async fn clear(&self) -> CoreResult<()> {
        match self {
            Self::Local(s) => s.clear().await,
            Self::Replicated(s) => s.clear().await,
            Self::Remote(s) => s.clear().await,
        }
    }
}

/// Parse scan ids, rejecting an empty list.
pub fn parse_ids(raw: &[String]) -> Result<Vec<ScanId>, CliError> {
    if raw.is_empty() {
        return Err(CliError::EmptyIds);
    }
    Ok(raw.iter().map(|id| ScanId::from(id.as_str())).collect())
}

/// JSON shape for `--json` listings
#[derive(Debug, Serialize)]
pub struct ScanListItem {
    pub id: String,
    pub tracking: String,
    pub timestamp: i64,
    pub captured: String,
    pub device_name: String,
    pub checked: bool,
}

pub fn scan_to_list_item(scan: &Scan) -> ScanListItem {
    ScanListItem {
        id: scan.id.to_string(),
        tracking: scan.tracking.clone(),
        timestamp: scan.timestamp,
        captured: format_timestamp(scan.timestamp),
        device_name: scan.device_name.clone(),
        checked: scan.checked,
    }
}

/// One aligned line per scan for human-readable listings
pub fn format_scan_lines(scans: &[Scan]) -> Vec<String> {
    scans
        .iter()
        .map(|scan| {
            let mark = if scan.checked { "✓" } else { " " };
            format!(
                "{mark} {:<8} {:<24} {} {}",
                scan.id.to_string(),
                scan.tracking,
                format_timestamp(scan.timestamp),
                scan.device_name
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(String::new, |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
