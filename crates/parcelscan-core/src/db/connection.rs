//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};

/// Wrapper around a `SQLite` connection shared by the scan store and the
/// settings repository.
///
/// The connection sits behind an async mutex: callers hold it only for the
/// duration of a single statement batch, so independent key operations stay
/// safe under interleaved async access without any cross-record transaction
/// guarantee.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist.
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        super::migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection for a batch of statements.
    pub async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

/// Configure `SQLite` for sensible local-store behavior
fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_in_memory_migrates() {
        let db = Database::open_in_memory().unwrap();
        // The scans table must exist after migration.
        let conn = db.conn.blocking_lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("scans.db");
        let db = Database::open(&path);
        assert!(db.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn reopen_is_idempotent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("scans.db");
        drop(Database::open(&path).unwrap());
        // Second open re-runs migrations without error.
        assert!(Database::open(&path).is_ok());
    }
}
