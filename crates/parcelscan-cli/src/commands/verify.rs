//! Bulk verification of a pasted or file-sourced batch of codes.

use std::path::PathBuf;

use parcelscan_core::verify;

use crate::commands::common::AnyStore;
use crate::error::CliError;

pub async fn verify(
    store: &AnyStore,
    text: Option<String>,
    file: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let input = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err(CliError::EmptyVerifyInput),
    };

    let report = verify::verify_bulk(store, &input).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in &report.entries {
        if entry.found {
            println!("✓ {}", entry.code);
        } else if entry.suggestions.is_empty() {
            println!("✗ {} (not found)", entry.code);
        } else {
            let near: Vec<&str> = entry
                .suggestions
                .iter()
                .map(|scan| scan.tracking.as_str())
                .collect();
            println!("✗ {} (not found, near: {})", entry.code, near.join(", "));
        }
    }
    println!(
        "{} of {} found, {} missing",
        report.found(),
        report.total(),
        report.missing()
    );
    Ok(())
}
