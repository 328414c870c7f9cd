//! Export all scans to CSV or JSON.

use std::path::PathBuf;

use chrono::Utc;
use parcelscan_core::store::ScanStore;
use parcelscan_core::transfer::{self, ExportFormat};

use crate::commands::common::AnyStore;
use crate::error::CliError;

pub async fn export(
    store: &AnyStore,
    format: ExportFormat,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<(), CliError> {
    let scans = store.get_all().await?;
    let rendered = transfer::render_export(&scans, format)?;

    if stdout {
        print!("{rendered}");
        return Ok(());
    }

    let path = output.unwrap_or_else(|| {
        PathBuf::from(transfer::export_file_name("parcelscan", format, Utc::now()))
    });
    std::fs::write(&path, rendered)?;
    println!("Exported {} scans to {}", scans.len(), path.display());
    Ok(())
}
