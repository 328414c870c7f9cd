//! Backing table for the scans resource.
//!
//! Keys are server-generated string ids of the form
//! `<timestamp>_<random-suffix>`. Randomness is the only collision
//! avoidance; creation retries once on a key conflict.

use std::path::Path;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::AppError;

/// Scan record as stored and served by this service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScan {
    pub id: String,
    pub tracking: String,
    pub timestamp: i64,
    pub device_name: String,
    pub checked: bool,
}

/// Body of a create request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiScan {
    pub tracking: String,
    pub timestamp: i64,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

/// Partial update merged into an existing scan
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanUpdates {
    pub tracking: Option<String>,
    pub timestamp: Option<i64>,
    pub device_name: Option<String>,
    pub checked: Option<bool>,
}

pub struct ScanTable {
    conn: Mutex<Connection>,
}

impl ScanTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS scans (
                 id TEXT PRIMARY KEY,
                 tracking TEXT NOT NULL,
                 timestamp INTEGER NOT NULL,
                 device_name TEXT NOT NULL,
                 checked INTEGER NOT NULL DEFAULT 0
             );
             CREATE INDEX IF NOT EXISTS idx_scans_timestamp ON scans(timestamp DESC);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All scans, newest first.
    pub async fn list(&self) -> Result<Vec<ApiScan>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, tracking, timestamp, device_name, checked FROM scans
             ORDER BY timestamp DESC",
        )?;
        let scans = stmt
            .query_map([], parse_scan)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scans)
    }

    /// Insert a scan under a freshly generated id.
    pub async fn create(&self, new: NewApiScan) -> Result<ApiScan, AppError> {
        let scan = ApiScan {
            id: generate_id(new.timestamp),
            tracking: new.tracking,
            timestamp: new.timestamp,
            device_name: new
                .device_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "unknown-device".to_string()),
            checked: new.checked,
        };

        let conn = self.conn.lock().await;
        let insert = |scan: &ApiScan| {
            conn.execute(
                "INSERT INTO scans (id, tracking, timestamp, device_name, checked)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    scan.id,
                    scan.tracking,
                    scan.timestamp,
                    scan.device_name,
                    i32::from(scan.checked)
                ],
            )
        };

        match insert(&scan) {
            Ok(_) => Ok(scan),
            // Key conflict: regenerate the suffix once.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let retried = ApiScan {
                    id: generate_id(scan.timestamp),
                    ..scan
                };
                insert(&retried)?;
                Ok(retried)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merge updates into the scan with the given id.
    pub async fn update(&self, id: &str, updates: ScanUpdates) -> Result<Option<ApiScan>, AppError> {
        let conn = self.conn.lock().await;
        let existing = conn.query_row(
            "SELECT id, tracking, timestamp, device_name, checked FROM scans WHERE id = ?",
            params![id],
            parse_scan,
        );
        let existing = match existing {
            Ok(scan) => scan,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let merged = ApiScan {
            id: existing.id,
            tracking: updates.tracking.unwrap_or(existing.tracking),
            timestamp: updates.timestamp.unwrap_or(existing.timestamp),
            device_name: updates.device_name.unwrap_or(existing.device_name),
            checked: updates.checked.unwrap_or(existing.checked),
        };

        conn.execute(
            "UPDATE scans SET tracking = ?, timestamp = ?, device_name = ?, checked = ?
             WHERE id = ?",
            params![
                merged.tracking,
                merged.timestamp,
                merged.device_name,
                i32::from(merged.checked),
                merged.id
            ],
        )?;

        Ok(Some(merged))
    }

    /// Delete scans by id; unknown ids are silently ignored in the count.
    pub async fn delete_many(&self, ids: &[String]) -> Result<usize, AppError> {
        let conn = self.conn.lock().await;
        let mut deleted = 0;
        for id in ids {
            deleted += conn.execute("DELETE FROM scans WHERE id = ?", params![id])?;
        }
        Ok(deleted)
    }
}

fn parse_scan(row: &Row<'_>) -> rusqlite::Result<ApiScan> {
    Ok(ApiScan {
        id: row.get(0)?,
        tracking: row.get(1)?,
        timestamp: row.get(2)?,
        device_name: row.get(3)?,
        checked: row.get::<_, i32>(4)? != 0,
    })
}

/// `<timestamp>_<random-suffix>`; the suffix is a UUID v4 fragment.
fn generate_id(timestamp: i64) -> String {
    let mut suffix = uuid::Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    format!("{timestamp}_{suffix}")
}
