//! Tracking code normalization and calendar-day helpers.
//!
//! [`normalize`] is the single source of truth for "what counts as the same
//! tracking code". Every storage, comparison, and search operation must go
//! through it; comparing a raw scanned value against normalized stored values
//! is the most likely latent bug class in this system.

use chrono::{Local, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

/// Milliseconds in a calendar day, minus one.
const DAY_SPAN_MS: i64 = 86_399_999;

/// Canonicalize a tracking code: strip all whitespace and hyphens, uppercase.
///
/// Total function with no failure mode, and idempotent:
/// `normalize(normalize(s)) == normalize(s)` for all `s`.
///
/// # Examples
///
/// ```
/// use parcelscan_core::tracking::normalize;
///
/// assert_eq!(normalize("1Z-999 AA1"), "1Z999AA1");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Split free text into candidate tracking codes for bulk verify.
///
/// Codes are separated by newlines, commas, or semicolons. Entries are
/// trimmed and empties dropped; normalization is left to the caller.
#[must_use]
pub fn split_verify_input(text: &str) -> Vec<String> {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[\n,;]+").expect("valid separator regex"));

    re.split(text)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Local-calendar-day window containing `timestamp_ms`.
///
/// Returns `(start_of_day, start_of_day + 86_399_999)` in epoch milliseconds.
/// Two scans with equal normalized tracking codes whose timestamps fall in
/// the same window form a duplicate pair.
#[must_use]
pub fn day_bounds(timestamp_ms: i64) -> (i64, i64) {
    let Some(local) = Local.timestamp_millis_opt(timestamp_ms).single() else {
        return (timestamp_ms, timestamp_ms);
    };

    let midnight = local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time");
    let start = Local
        .from_local_datetime(&midnight)
        .earliest()
        .map_or(timestamp_ms, |dt| dt.timestamp_millis());

    (start, start + DAY_SPAN_MS)
}

/// Check whether two timestamps fall on the same local calendar day.
#[must_use]
pub fn same_day(a_ms: i64, b_ms: i64) -> bool {
    let (start, end) = day_bounds(a_ms);
    (start..=end).contains(&b_ms)
}
