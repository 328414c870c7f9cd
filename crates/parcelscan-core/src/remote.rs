//! HTTP client for the remote scans service.
//!
//! The remote service exposes four operations over a single resource path
//! with JSON bodies. In dual-write mode the client is invoked best-effort
//! after each local mutation; in remote-only mode every store call goes
//! through it directly.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout applied to every remote request. The dual-write path is
/// best-effort and must not hang the caller on a degraded network.
const REMOTE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Remote scan not found: {0}")]
    NotFound(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Scan record as represented by the remote store (string ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScan {
    pub id: String,
    pub tracking: String,
    pub timestamp: i64,
    pub device_name: String,
    pub checked: bool,
}

/// Body for creating a scan remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNewScan {
    pub tracking: String,
    pub timestamp: i64,
    pub device_name: String,
    pub checked: bool,
}

/// Partial update merged into an existing remote scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl RemoteUpdates {
    /// Update that flips only the checked flag.
    #[must_use]
    pub const fn checked(value: bool) -> Self {
        Self {
            tracking: None,
            timestamp: None,
            device_name: None,
            checked: Some(value),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScansEnvelope {
    scans: Vec<RemoteScan>,
}

#[derive(Debug, Deserialize)]
struct ScanEnvelope {
    #[allow(dead_code)]
    success: bool,
    scan: RemoteScan,
}

#[derive(Debug, Deserialize)]
struct DeleteEnvelope {
    #[allow(dead_code)]
    success: bool,
    deleted: usize,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    id: &'a str,
    updates: &'a RemoteUpdates,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the remote scans resource.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteClient {
    /// Build a client for the given scans endpoint
    /// (e.g. `https://api.example.com/v1/scans`).
    pub fn new(endpoint: impl Into<String>) -> RemoteResult<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REMOTE_TIMEOUT_SECS))
            .build()?;
        Ok(Self { endpoint, client })
    }

    /// Fetch every scan the remote store holds. The server may return any
    /// order; callers sort by timestamp descending.
    pub async fn fetch_all(&self) -> RemoteResult<Vec<RemoteScan>> {
        let response = self.client.get(&self.endpoint).send().await?;
        let response = check_status(response).await?;
        let payload = response.json::<ScansEnvelope>().await?;
        Ok(payload.scans)
    }

    /// Create a scan; the server assigns a string id.
    pub async fn create(&self, scan: &RemoteNewScan) -> RemoteResult<RemoteScan> {
        let response = self.client.post(&self.endpoint).json(scan).send().await?;
        let response = check_status(response).await?;
        let payload = response.json::<ScanEnvelope>().await?;
        Ok(payload.scan)
    }

    /// Merge a partial update into the scan with the given id.
    pub async fn update(&self, id: &str, updates: &RemoteUpdates) -> RemoteResult<RemoteScan> {
        let body = PutBody { id, updates };
        let response = self.client.put(&self.endpoint).json(&body).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        let response = check_status(response).await?;
        let payload = response.json::<ScanEnvelope>().await?;
        Ok(payload.scan)
    }

    /// Delete scans by id; unknown ids are silently ignored in the count.
    pub async fn delete(&self, ids: &[String]) -> RemoteResult<usize> {
        let body = DeleteBody { ids };
        let response = self
            .client
            .delete(&self.endpoint)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let payload = response.json::<DeleteEnvelope>().await?;
        Ok(payload.deleted)
    }
}

async fn check_status(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api(parse_api_error(status, &body)))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed.chars().take(180).collect::<String>(), status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> RemoteResult<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
