//! Scan model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier for a scan record.
///
/// The local store assigns auto-incrementing integers (never reused after
/// deletion); the remote store assigns server-generated string tokens. Both
/// forms serialize transparently (number or string) to match the wire
/// contract's `ids: (string|number)[]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanId {
    /// Auto-incrementing integer assigned by the local store
    Local(i64),
    /// Server-generated token assigned by the remote store
    Remote(String),
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "{id}"),
            Self::Remote(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for ScanId {
    fn from(s: &str) -> Self {
        s.parse::<i64>()
            .map_or_else(|_| Self::Remote(s.to_string()), Self::Local)
    }
}

impl FromStr for ScanId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A captured parcel scan, the only persistent entity in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    /// Identifier assigned by the record store on insert; immutable
    pub id: ScanId,
    /// Normalized tracking code (uppercase, no whitespace/dashes)
    pub tracking: String,
    /// Capture time in milliseconds since epoch, stamped by the client
    pub timestamp: i64,
    /// Free-text label for the capturing device/operator
    pub device_name: String,
    /// Verification flag, flippable at any time after creation
    pub checked: bool,
    /// Back-reference to the remote store's id (dual-write mode only).
    /// Routing metadata, not part of the logical record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

/// A scan waiting for the record store to assign its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScan {
    pub tracking: String,
    pub timestamp: i64,
    pub device_name: String,
    pub checked: bool,
}

impl NewScan {
    /// Build an unchecked scan stamped with the current time.
    ///
    /// `tracking` must already be normalized (see [`crate::tracking::normalize`]).
    #[must_use]
    pub fn captured_now(tracking: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            tracking: tracking.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            device_name: device_name.into(),
            checked: false,
        }
    }
}
