//! Listing commands: `list` and `stats`.

use parcelscan_core::store::ScanStore;

use crate::commands::common::{format_scan_lines, scan_to_list_item, AnyStore};
use crate::error::CliError;

pub async fn list(store: &AnyStore, limit: usize, json: bool) -> Result<(), CliError> {
    let mut scans = store.get_all().await?;
    scans.truncate(limit);

    if json {
        let items: Vec<_> = scans.iter().map(scan_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if scans.is_empty() {
        println!("No scans recorded");
        return Ok(());
    }
    for line in format_scan_lines(&scans) {
        println!("{line}");
    }
    Ok(())
}

pub async fn stats(store: &AnyStore) -> Result<(), CliError> {
    let scans = store.get_all().await?;
    let checked = scans.iter().filter(|scan| scan.checked).count();
    println!("Total:     {}", scans.len());
    println!("Checked:   {checked}");
    println!("Unchecked: {}", scans.len() - checked);
    Ok(())
}
