//! Dual-write store: local `SQLite` plus best-effort remote replication.
//!
//! The local write is authoritative and always completes first. Each
//! successful mutation is then mirrored to the remote service with one
//! bounded retry; failures are logged and dropped. There is no rollback, no
//! reconciliation, and replication status is never surfaced to the operator.

use std::time::Duration;

use crate::error::Result;
use crate::models::{NewScan, Scan, ScanId};
use crate::remote::{RemoteClient, RemoteError, RemoteNewScan, RemoteUpdates};
use crate::store::{ScanStore, SqliteStore};

/// Delay before the single replication retry
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Local store with best-effort replication to a remote scans service
pub struct ReplicatedStore {
    local: SqliteStore,
    remote: RemoteClient,
}

impl ReplicatedStore {
    #[must_use]
    pub const fn new(local: SqliteStore, remote: RemoteClient) -> Self {
        Self { local, remote }
    }

    /// The authoritative local store
    #[must_use]
    pub const fn local(&self) -> &SqliteStore {
        &self.local
    }

    /// Run a replication call with one bounded retry, logging failure.
    async fn replicate<T, F, Fut>(&self, operation: &str, call: F) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, RemoteError>>,
    {
        match call().await {
            Ok(value) => return Some(value),
            Err(error) => {
                tracing::debug!(operation, %error, "remote replication failed, retrying once");
            }
        }

        tokio::time::sleep(RETRY_DELAY).await;
        match call().await {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(operation, %error, "remote replication dropped");
                None
            }
        }
    }
}

impl ScanStore for ReplicatedStore {
    async fn insert(&self, scan: NewScan) -> Result<Scan> {
        let mut inserted = self.local.insert(scan).await?;

        let body = RemoteNewScan {
            tracking: inserted.tracking.clone(),
            timestamp: inserted.timestamp,
            device_name: inserted.device_name.clone(),
            checked: inserted.checked,
        };
        if let Some(remote) = self.replicate("create", || self.remote.create(&body)).await {
            // Remote id is routing metadata only; losing it is tolerated.
            if self
                .local
                .set_remote_id(&inserted.id, &remote.id)
                .await
                .is_ok()
            {
                inserted.remote_id = Some(remote.id);
            }
        }

        Ok(inserted)
    }

    async fn get_all(&self) -> Result<Vec<Scan>> {
        self.local.get_all().await
    }

    async fn get_by_tracking_exact(&self, code: &str) -> Result<Option<Scan>> {
        self.local.get_by_tracking_exact(code).await
    }

    async fn search(&self, normalized: &str, limit: usize) -> Result<Vec<Scan>> {
        self.local.search(normalized, limit).await
    }

    async fn find_same_day(&self, normalized: &str, timestamp_ms: i64) -> Result<Option<Scan>> {
        self.local.find_same_day(normalized, timestamp_ms).await
    }

    async fn update_checked(&self, id: &ScanId, checked: bool) -> Result<usize> {
        let rows = self.local.update_checked(id, checked).await?;

        if let Some(remote_id) = remote_id_for(&self.local, id).await {
            let updates = RemoteUpdates::checked(checked);
            self.replicate("update", || self.remote.update(&remote_id, &updates))
                .await;
        }

        Ok(rows)
    }

    async fn delete_many(&self, ids: &[ScanId]) -> Result<usize> {
        // Resolve remote ids before the rows disappear locally.
        let mut remote_ids = Vec::new();
        for id in ids {
            if let Some(remote_id) = remote_id_for(&self.local, id).await {
                remote_ids.push(remote_id);
            }
        }

        let deleted = self.local.delete_many(ids).await?;

        if !remote_ids.is_empty() {
            self.replicate("delete", || self.remote.delete(&remote_ids))
                .await;
        }

        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        self.local.count().await
    }

    async fn clear(&self) -> Result<()> {
        let all = self.local.get_all().await?;
        let remote_ids: Vec<String> = all.into_iter().filter_map(|scan| scan.remote_id).collect();

        self.local.clear().await?;

        if !remote_ids.is_empty() {
            self.replicate("clear", || self.remote.delete(&remote_ids))
                .await;
        }

        Ok(())
    }
}

/// Look up the remote id recorded for a local scan, if replication of its
/// insert succeeded.
async fn remote_id_for(local: &SqliteStore, id: &ScanId) -> Option<String> {
    let all = local.get_all().await.ok()?;
    all.into_iter()
        .find(|scan| &scan.id == id)
        .and_then(|scan| scan.remote_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Remote endpoint that accepts TCP on no port; every call fails fast.
    fn unreachable_remote() -> RemoteClient {
        RemoteClient::new("http://127.0.0.1:9/v1/scans").unwrap()
    }

    fn setup() -> ReplicatedStore {
        ReplicatedStore::new(SqliteStore::open_in_memory().unwrap(), unreachable_remote())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_write_survives_remote_failure() {
        let store = setup();
        let scan = store
            .insert(NewScan {
                tracking: "ABC123".to_string(),
                timestamp: 1,
                device_name: "desk".to_string(),
                checked: false,
            })
            .await
            .unwrap();

        // Replication failed, local record stands, no remote id recorded.
        assert!(scan.remote_id.is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn updates_and_deletes_stay_local_on_remote_failure() {
        let store = setup();
        let scan = store
            .insert(NewScan {
                tracking: "ABC123".to_string(),
                timestamp: 1,
                device_name: "desk".to_string(),
                checked: false,
            })
            .await
            .unwrap();

        assert_eq!(store.update_checked(&scan.id, true).await.unwrap(), 1);
        assert_eq!(store.delete_many(&[scan.id]).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
