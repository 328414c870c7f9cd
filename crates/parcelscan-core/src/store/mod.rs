//! Record store: a durable collection of scans.
//!
//! One trait, three implementations selected at startup (no runtime switch):
//!
//! - [`SqliteStore`]: local, authoritative.
//! - [`ReplicatedStore`]: local plus best-effort remote replication
//!   (dual-write mode).
//! - [`RemoteStore`]: the remote service is the sole source of truth
//!   (remote-only mode).

pub mod remote_store;
pub mod replicated;
pub mod sqlite;

pub use remote_store::RemoteStore;
pub use replicated::ReplicatedStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::{NewScan, Scan, ScanId};

/// Storage contract shared by all deployment modes.
///
/// `search` is substring-based (contains, not prefix) over normalized
/// tracking codes, newest first. `get_by_tracking_exact` breaks ties between
/// duplicates across days by most recent timestamp.
#[allow(async_fn_in_trait)]
pub trait ScanStore {
    /// Insert a scan, assigning and returning its id.
    async fn insert(&self, scan: NewScan) -> Result<Scan>;

    /// All scans, newest first.
    async fn get_all(&self) -> Result<Vec<Scan>>;

    /// Exact match on a normalized tracking code; most recent wins.
    async fn get_by_tracking_exact(&self, code: &str) -> Result<Option<Scan>>;

    /// Up to `limit` scans whose tracking contains `normalized`, newest first.
    async fn search(&self, normalized: &str, limit: usize) -> Result<Vec<Scan>>;

    /// A scan with the same normalized tracking whose timestamp falls on the
    /// same local calendar day as `timestamp_ms`, if any.
    async fn find_same_day(&self, normalized: &str, timestamp_ms: i64) -> Result<Option<Scan>>;

    /// Set the checked flag; idempotent. Returns the number of rows touched,
    /// or [`crate::Error::NotFound`] when no scan has the given id.
    async fn update_checked(&self, id: &ScanId, checked: bool) -> Result<usize>;

    /// Best-effort bulk delete; missing ids are not an error. Returns the
    /// number of scans actually removed.
    async fn delete_many(&self, ids: &[ScanId]) -> Result<usize>;

    /// Total number of scans.
    async fn count(&self) -> Result<usize>;

    /// Delete everything.
    async fn clear(&self) -> Result<()>;
}
