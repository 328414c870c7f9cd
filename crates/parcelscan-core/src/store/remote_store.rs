//! Remote-only store: the scans service is the sole source of truth.
//!
//! Every operation is a direct round trip; failures propagate to the caller
//! as [`crate::Error::Remote`]. The remote API exposes no query operations,
//! so lookups fetch the full collection and filter client-side, mirroring
//! how thin clients of the service behave.

use crate::error::{Error, Result};
use crate::models::{NewScan, Scan, ScanId};
use crate::remote::{RemoteClient, RemoteScan, RemoteUpdates};
use crate::store::ScanStore;
use crate::tracking;

/// Store backed solely by the remote scans service
pub struct RemoteStore {
    client: RemoteClient,
}

impl RemoteStore {
    #[must_use]
    pub const fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    async fn fetch_sorted(&self) -> Result<Vec<Scan>> {
        let mut scans: Vec<Scan> = self
            .client
            .fetch_all()
            .await
            .map_err(Error::Remote)?
            .into_iter()
            .map(from_remote)
            .collect();
        scans.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(scans)
    }
}

fn from_remote(scan: RemoteScan) -> Scan {
    Scan {
        id: ScanId::Remote(scan.id),
        tracking: scan.tracking,
        timestamp: scan.timestamp,
        device_name: scan.device_name,
        checked: scan.checked,
        remote_id: None,
    }
}

fn remote_ids(ids: &[ScanId]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| match id {
            ScanId::Remote(remote) => Some(remote.clone()),
            ScanId::Local(_) => None,
        })
        .collect()
}

impl ScanStore for RemoteStore {
    async fn insert(&self, scan: NewScan) -> Result<Scan> {
        let body = crate::remote::RemoteNewScan {
            tracking: scan.tracking,
            timestamp: scan.timestamp,
            device_name: scan.device_name,
            checked: scan.checked,
        };
        let created = self.client.create(&body).await.map_err(Error::Remote)?;
        Ok(from_remote(created))
    }

    async fn get_all(&self) -> Result<Vec<Scan>> {
        self.fetch_sorted().await
    }

    async fn get_by_tracking_exact(&self, code: &str) -> Result<Option<Scan>> {
        // fetch_sorted is newest first, so the first hit is the tie-break winner.
        Ok(self
            .fetch_sorted()
            .await?
            .into_iter()
            .find(|scan| scan.tracking == code))
    }

    async fn search(&self, normalized: &str, limit: usize) -> Result<Vec<Scan>> {
        Ok(self
            .fetch_sorted()
            .await?
            .into_iter()
            .filter(|scan| scan.tracking.contains(normalized))
            .take(limit)
            .collect())
    }

    async fn find_same_day(&self, normalized: &str, timestamp_ms: i64) -> Result<Option<Scan>> {
        Ok(self.fetch_sorted().await?.into_iter().find(|scan| {
            scan.tracking == normalized && tracking::same_day(timestamp_ms, scan.timestamp)
        }))
    }

    async fn update_checked(&self, id: &ScanId, checked: bool) -> Result<usize> {
        let ScanId::Remote(remote) = id else {
            return Err(Error::InvalidInput(format!(
                "expected a remote id, got {id}"
            )));
        };
        let updates = RemoteUpdates::checked(checked);
        match self.client.update(remote, &updates).await {
            Ok(_) => Ok(1),
            Err(crate::remote::RemoteError::NotFound(id)) => Err(Error::NotFound(id)),
            Err(other) => Err(Error::Remote(other)),
        }
    }

    async fn delete_many(&self, ids: &[ScanId]) -> Result<usize> {
        let ids = remote_ids(ids);
        if ids.is_empty() {
            return Ok(0);
        }
        self.client.delete(&ids).await.map_err(Error::Remote)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.fetch_sorted().await?.len())
    }

    async fn clear(&self) -> Result<()> {
        let ids: Vec<String> = self
            .client
            .fetch_all()
            .await
            .map_err(Error::Remote)?
            .into_iter()
            .map(|scan| scan.id)
            .collect();
        if !ids.is_empty() {
            self.client.delete(&ids).await.map_err(Error::Remote)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_remote_maps_ids() {
        let scan = from_remote(RemoteScan {
            id: "1700_ab12cd34".to_string(),
            tracking: "ABC".to_string(),
            timestamp: 5,
            device_name: "desk".to_string(),
            checked: true,
        });
        assert_eq!(scan.id, ScanId::Remote("1700_ab12cd34".to_string()));
        assert!(scan.checked);
    }

    #[test]
    fn remote_ids_skips_local_ids() {
        let ids = remote_ids(&[
            ScanId::Local(1),
            ScanId::Remote("a".to_string()),
            ScanId::Remote("b".to_string()),
        ]);
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_remote_propagates_errors() {
        let store = RemoteStore::new(RemoteClient::new("http://127.0.0.1:9/v1/scans").unwrap());
        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }
}
