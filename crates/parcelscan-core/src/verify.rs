//! Single-term search and bulk verify.

use serde::Serialize;

use crate::error::Result;
use crate::models::Scan;
use crate::store::ScanStore;
use crate::tracking;

/// Cap on single-term search results
pub const SEARCH_LIMIT: usize = 200;

/// Cap on typo suggestions per missing code
pub const SUGGESTION_LIMIT: usize = 5;

/// Substring search over normalized tracking codes, newest first.
///
/// Interactive callers should debounce invocations (~150ms) so the store is
/// not flooded on every keystroke; that is a UI-responsiveness contract, not
/// a correctness one.
pub async fn search<S: ScanStore>(store: &S, term: &str) -> Result<Vec<Scan>> {
    let normalized = tracking::normalize(term);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }
    store.search(&normalized, SEARCH_LIMIT).await
}

/// Verification outcome for one input code, in input order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEntry {
    /// Normalized code as looked up
    pub code: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<Scan>,
    /// Near-miss candidates when no exact match exists
    pub suggestions: Vec<Scan>,
}

/// Aggregate bulk-verify result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    #[must_use]
    pub fn found(&self) -> usize {
        self.entries.iter().filter(|entry| entry.found).count()
    }

    #[must_use]
    pub fn missing(&self) -> usize {
        self.total() - self.found()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

/// Verify a batch of tracking codes pasted as free text.
///
/// Codes are separated by newlines, commas, or semicolons. Each code gets an
/// exact lookup; misses additionally collect up to [`SUGGESTION_LIMIT`]
/// substring suggestions (excluding an exact self-hit) to help the operator
/// spot typos.
pub async fn verify_bulk<S: ScanStore>(store: &S, text: &str) -> Result<VerifyReport> {
    let mut entries = Vec::new();

    for raw in tracking::split_verify_input(text) {
        let code = tracking::normalize(&raw);
        if code.is_empty() {
            continue;
        }

        let matched = store.get_by_tracking_exact(&code).await?;
        let found = matched.is_some();

        let suggestions = if found {
            Vec::new()
        } else {
            store
                .search(&code, SUGGESTION_LIMIT + 1)
                .await?
                .into_iter()
                .filter(|scan| scan.tracking != code)
                .take(SUGGESTION_LIMIT)
                .collect()
        };

        entries.push(VerifyEntry {
            code,
            found,
            matched,
            suggestions,
        });
    }

    Ok(VerifyReport { entries })
}
