use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] parcelscan_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No scan ids provided")]
    EmptyIds,
    #[error("Verify needs inline text or --file")]
    EmptyVerifyInput,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Remote store error: {0}")]
    Remote(#[from] parcelscan_core::remote::RemoteError),
}
