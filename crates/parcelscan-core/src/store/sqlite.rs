//! Local `SQLite` scan store

use rusqlite::{params, Row};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewScan, Scan, ScanId};
use crate::store::ScanStore;
use crate::tracking;

/// `SQLite`-backed authoritative store
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wrap an already-opened database
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Access the underlying database (settings repository shares it)
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Record the remote store's id on a local scan after replication.
    pub async fn set_remote_id(&self, id: &ScanId, remote_id: &str) -> Result<()> {
        let ScanId::Local(local) = id else {
            return Err(Error::InvalidInput(format!(
                "expected a local id, got {id}"
            )));
        };
        let conn = self.db.conn().await;
        conn.execute(
            "UPDATE scans SET remote_id = ? WHERE id = ?",
            params![remote_id, local],
        )?;
        Ok(())
    }

    /// Parse a scan from a database row
    fn parse_scan(row: &Row<'_>) -> rusqlite::Result<Scan> {
        Ok(Scan {
            id: ScanId::Local(row.get(0)?),
            tracking: row.get(1)?,
            timestamp: row.get(2)?,
            device_name: row.get(3)?,
            checked: row.get::<_, i32>(4)? != 0,
            remote_id: row.get(5)?,
        })
    }
}

const SCAN_COLUMNS: &str = "id, tracking, timestamp, device_name, checked, remote_id";

impl ScanStore for SqliteStore {
    async fn insert(&self, scan: NewScan) -> Result<Scan> {
        let conn = self.db.conn().await;
        conn.execute(
            "INSERT INTO scans (tracking, timestamp, device_name, checked) VALUES (?, ?, ?, ?)",
            params![
                scan.tracking,
                scan.timestamp,
                scan.device_name,
                i32::from(scan.checked)
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Scan {
            id: ScanId::Local(id),
            tracking: scan.tracking,
            timestamp: scan.timestamp,
            device_name: scan.device_name,
            checked: scan.checked,
            remote_id: None,
        })
    }

    async fn get_all(&self) -> Result<Vec<Scan>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCAN_COLUMNS} FROM scans ORDER BY timestamp DESC, id DESC"
        ))?;
        let scans = stmt
            .query_map([], Self::parse_scan)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scans)
    }

    async fn get_by_tracking_exact(&self, code: &str) -> Result<Option<Scan>> {
        let conn = self.db.conn().await;
        let result = conn.query_row(
            &format!(
                "SELECT {SCAN_COLUMNS} FROM scans WHERE tracking = ?
                 ORDER BY timestamp DESC LIMIT 1"
            ),
            params![code],
            Self::parse_scan,
        );

        match result {
            Ok(scan) => Ok(Some(scan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn search(&self, normalized: &str, limit: usize) -> Result<Vec<Scan>> {
        let conn = self.db.conn().await;
        // instr() gives substring containment without LIKE-wildcard escaping.
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCAN_COLUMNS} FROM scans WHERE instr(tracking, ?) > 0
             ORDER BY timestamp DESC, id DESC LIMIT ?"
        ))?;
        #[allow(clippy::cast_possible_wrap)]
        let scans = stmt
            .query_map(params![normalized, limit as i64], Self::parse_scan)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scans)
    }

    async fn find_same_day(&self, normalized: &str, timestamp_ms: i64) -> Result<Option<Scan>> {
        let (start, end) = tracking::day_bounds(timestamp_ms);
        let conn = self.db.conn().await;
        let result = conn.query_row(
            &format!(
                "SELECT {SCAN_COLUMNS} FROM scans
                 WHERE tracking = ? AND timestamp BETWEEN ? AND ? LIMIT 1"
            ),
            params![normalized, start, end],
            Self::parse_scan,
        );

        match result {
            Ok(scan) => Ok(Some(scan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_checked(&self, id: &ScanId, checked: bool) -> Result<usize> {
        let ScanId::Local(local) = id else {
            return Err(Error::NotFound(id.to_string()));
        };
        let conn = self.db.conn().await;
        let rows = conn.execute(
            "UPDATE scans SET checked = ? WHERE id = ?",
            params![i32::from(checked), local],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(rows)
    }

    async fn delete_many(&self, ids: &[ScanId]) -> Result<usize> {
        let conn = self.db.conn().await;
        let mut deleted = 0;
        for id in ids {
            if let ScanId::Local(local) = id {
                deleted += conn.execute("DELETE FROM scans WHERE id = ?", params![local])?;
            }
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.db.conn().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.db.conn().await;
        conn.execute("DELETE FROM scans", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn scan(tracking: &str, timestamp: i64) -> NewScan {
        NewScan {
            tracking: tracking.to_string(),
            timestamp,
            device_name: "test-desk".to_string(),
            checked: false,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_assigns_increasing_ids() {
        let store = setup();
        let a = store.insert(scan("AAA", 1)).await.unwrap();
        let b = store.insert(scan("BBB", 2)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ids_are_never_reused() {
        let store = setup();
        let a = store.insert(scan("AAA", 1)).await.unwrap();
        store.delete_many(&[a.id.clone()]).await.unwrap();
        let b = store.insert(scan("BBB", 2)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_all_is_newest_first() {
        let store = setup();
        store.insert(scan("T1", 100)).await.unwrap();
        store.insert(scan("T3", 300)).await.unwrap();
        store.insert(scan("T2", 200)).await.unwrap();

        let all = store.get_all().await.unwrap();
        let trackings: Vec<&str> = all.iter().map(|s| s.tracking.as_str()).collect();
        assert_eq!(trackings, vec!["T3", "T2", "T1"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_is_substring_not_prefix() {
        let store = setup();
        store.insert(scan("XYZ999ABC", 100)).await.unwrap();
        store.insert(scan("UNRELATED", 200)).await.unwrap();

        let hits = store.search("99AB", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tracking, "XYZ999ABC");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_honors_limit_newest_first() {
        let store = setup();
        for i in 0..5 {
            store.insert(scan(&format!("CODE{i}"), i)).await.unwrap();
        }
        let hits = store.search("CODE", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].tracking, "CODE4");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exact_match_prefers_most_recent() {
        let store = setup();
        store.insert(scan("SAME", 100)).await.unwrap();
        let newer = store.insert(scan("SAME", 200)).await.unwrap();

        let hit = store.get_by_tracking_exact("SAME").await.unwrap().unwrap();
        assert_eq!(hit.id, newer.id);
        assert!(store
            .get_by_tracking_exact("MISSING")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn find_same_day_windows_by_calendar_day() {
        let store = setup();
        let (start, _) = crate::tracking::day_bounds(chrono::Utc::now().timestamp_millis());
        let morning = start + 9 * 3_600_000;
        store.insert(scan("ABC123", morning)).await.unwrap();

        let hit = store
            .find_same_day("ABC123", morning + 60_000)
            .await
            .unwrap();
        assert!(hit.is_some());

        let next_day = store
            .find_same_day("ABC123", morning + 25 * 3_600_000)
            .await
            .unwrap();
        assert!(next_day.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_checked_is_idempotent() {
        let store = setup();
        let inserted = store.insert(scan("AAA", 1)).await.unwrap();

        assert_eq!(store.update_checked(&inserted.id, true).await.unwrap(), 1);
        assert_eq!(store.update_checked(&inserted.id, true).await.unwrap(), 1);

        let all = store.get_all().await.unwrap();
        assert!(all[0].checked);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_checked_unknown_id_is_not_found() {
        let store = setup();
        let err = store
            .update_checked(&ScanId::Local(999), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_many_ignores_missing_ids() {
        let store = setup();
        let a = store.insert(scan("AAA", 1)).await.unwrap();
        store.insert(scan("BBB", 2)).await.unwrap();

        let deleted = store
            .delete_many(&[a.id, ScanId::Local(999)])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_removes_everything() {
        let store = setup();
        store.insert(scan("AAA", 1)).await.unwrap();
        store.insert(scan("BBB", 2)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_remote_id_round_trips() {
        let store = setup();
        let inserted = store.insert(scan("AAA", 1)).await.unwrap();
        store
            .set_remote_id(&inserted.id, "1700_abcd1234")
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all[0].remote_id.as_deref(), Some("1700_abcd1234"));
    }
}
