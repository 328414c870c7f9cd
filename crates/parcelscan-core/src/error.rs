//! Error types for parcelscan-core

use thiserror::Error;

/// Result type alias using parcelscan-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in parcelscan-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-layer fault (database unavailable, corrupt, etc.)
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Scan not found
    #[error("Scan not found: {0}")]
    NotFound(String),

    /// A scan with the same normalized tracking code already exists for the
    /// current calendar day. This is a routing signal, not a hard failure:
    /// the caller may re-invoke the forced variant to insert anyway.
    #[error("Duplicate scan for today: {tracking}")]
    Duplicate { tracking: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote store error (remote-only deployment mode)
    #[error("Remote store error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    /// Import file rejected before parsing (wrong extension or too large)
    #[error("Import rejected: {0}")]
    ImportRejected(String),
}
