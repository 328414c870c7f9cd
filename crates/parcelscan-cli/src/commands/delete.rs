//! Mutating commands: `check`, `uncheck`, `delete`, `clear`.

use std::io::{self, BufRead, Write};

use parcelscan_core::store::ScanStore;
use parcelscan_core::Error;

use crate::commands::common::{parse_ids, AnyStore};
use crate::error::CliError;

/// Flip the verified flag on each listed scan. Missing ids are reported but
/// do not abort the batch.
pub async fn set_checked(store: &AnyStore, ids: &[String], checked: bool) -> Result<(), CliError> {
    let ids = parse_ids(ids)?;
    let mut updated = 0usize;
    for id in &ids {
        match store.update_checked(id, checked).await {
            Ok(n) => updated += n,
            Err(Error::NotFound(_)) => println!("No scan with id {id}"),
            Err(err) => return Err(err.into()),
        }
    }
    let verb = if checked { "Checked" } else { "Unchecked" };
    println!("{verb} {updated} of {} scans", ids.len());
    Ok(())
}

pub async fn delete(store: &AnyStore, ids: &[String]) -> Result<(), CliError> {
    let ids = parse_ids(ids)?;
    let deleted = store.delete_many(&ids).await?;
    println!("Deleted {deleted} of {} scans", ids.len());
    Ok(())
}

/// Delete every scan, prompting for confirmation unless `yes` is set.
pub async fn clear(store: &AnyStore, yes: bool) -> Result<(), CliError> {
    let total = store.count().await?;
    if total == 0 {
        println!("Nothing to clear");
        return Ok(());
    }

    if !yes && !confirm(&format!("Delete all {total} scans? [y/N] "))? {
        println!("Aborted");
        return Ok(());
    }

    store.clear().await?;
    println!("Deleted {total} scans");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
