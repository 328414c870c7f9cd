//! Substring search over stored tracking codes.

use parcelscan_core::verify;

use crate::commands::common::{format_scan_lines, scan_to_list_item, AnyStore};
use crate::error::CliError;

pub async fn search(store: &AnyStore, term: &str, json: bool) -> Result<(), CliError> {
    let scans = verify::search(store, term).await?;

    if json {
        let items: Vec<_> = scans.iter().map(scan_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if scans.is_empty() {
        println!("No scans match {term:?}");
        return Ok(());
    }
    for line in format_scan_lines(&scans) {
        println!("{line}");
    }
    Ok(())
}
