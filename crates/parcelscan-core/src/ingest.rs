//! Scan ingestion: normalize, duplicate-check, insert.
//!
//! Duplicate detection is per local calendar day: a second scan of the same
//! normalized code on the same day is flagged back to the caller, never
//! silently rejected. The caller decides whether to force-insert.

use crate::error::{Error, Result};
use crate::models::{NewScan, Scan, ScanConfig, ScanId};
use crate::store::ScanStore;
use crate::tracking;

/// Feedback cues the caller should fire after a successful capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub audio: bool,
    pub haptic: bool,
}

/// A successfully ingested scan plus the feedback cues it earned
#[derive(Debug, Clone)]
pub struct Ingested {
    pub scan: Scan,
    pub feedback: Feedback,
}

/// Orchestrates capture output into the record store
pub struct Ingestor<'a, S: ScanStore> {
    store: &'a S,
    config: ScanConfig,
}

impl<'a, S: ScanStore> Ingestor<'a, S> {
    /// Build an ingestor over the given store with explicit configuration
    pub const fn new(store: &'a S, config: ScanConfig) -> Self {
        Self { store, config }
    }

    /// Normalize, duplicate-check for the current day, and insert.
    ///
    /// Returns [`Error::Duplicate`] carrying the normalized code when a scan
    /// with the same code already exists today.
    pub async fn ingest(&self, raw_code: &str) -> Result<Ingested> {
        let normalized = self.validate(raw_code)?;
        let now = chrono::Utc::now().timestamp_millis();

        if self.store.find_same_day(&normalized, now).await?.is_some() {
            return Err(Error::Duplicate {
                tracking: normalized,
            });
        }

        self.insert(normalized, now).await
    }

    /// Insert unconditionally, skipping the duplicate check.
    pub async fn ingest_forced(&self, raw_code: &str) -> Result<Ingested> {
        let normalized = self.validate(raw_code)?;
        let now = chrono::Utc::now().timestamp_millis();
        self.insert(normalized, now).await
    }

    /// Delete a just-created scan (the "undo" affordance).
    pub async fn undo(&self, id: &ScanId) -> Result<()> {
        self.store.delete_many(std::slice::from_ref(id)).await?;
        Ok(())
    }

    fn validate(&self, raw_code: &str) -> Result<String> {
        let normalized = tracking::normalize(raw_code);
        if normalized.is_empty() {
            return Err(Error::InvalidInput(
                "tracking code is empty after normalization".to_string(),
            ));
        }
        Ok(normalized)
    }

    async fn insert(&self, normalized: String, timestamp: i64) -> Result<Ingested> {
        let scan = self
            .store
            .insert(NewScan {
                tracking: normalized,
                timestamp,
                device_name: self.config.effective_device_name().to_string(),
                checked: false,
            })
            .await?;

        Ok(Ingested {
            scan,
            feedback: Feedback {
                audio: self.config.audio_feedback,
                haptic: self.config.haptic_feedback,
            },
        })
    }
}
