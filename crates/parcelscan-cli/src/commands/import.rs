//! Import scans from a CSV or JSON file.

use std::path::Path;

use parcelscan_core::transfer;

use crate::commands::common::AnyStore;
use crate::error::CliError;

pub async fn import(store: &AnyStore, path: &Path) -> Result<(), CliError> {
    let report = transfer::import_file(store, path).await?;

    println!(
        "Imported {} of {} rows ({} skipped as same-day duplicates)",
        report.imported, report.total_rows, report.skipped
    );
    for error in &report.errors {
        println!("  {error}");
    }
    Ok(())
}
