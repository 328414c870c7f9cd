//! Capture commands: `scan` (stdin stream) and `add` (single code).

use std::io::{self, BufRead, Write};

use parcelscan_core::ingest::{Ingested, Ingestor};
use parcelscan_core::{Error, ScanConfig};

use crate::commands::common::{format_timestamp, AnyStore};
use crate::error::CliError;

/// Record a single tracking code.
pub async fn add(
    store: &AnyStore,
    config: ScanConfig,
    code: &str,
    force: bool,
) -> Result<(), CliError> {
    let ingestor = Ingestor::new(store, config);
    let ingested = if force {
        ingestor.ingest_forced(code).await?
    } else {
        match ingestor.ingest(code).await {
            Ok(ingested) => ingested,
            Err(Error::Duplicate { tracking }) => {
                println!("Skipped {tracking}: already scanned today (use --force to keep)");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    };
    report_capture(&ingested);
    Ok(())
}

/// Ingest codes from stdin, one per line, until EOF. Blank lines are
/// skipped; duplicates are reported and skipped unless `force` is set.
pub async fn stream(store: &AnyStore, config: ScanConfig, force: bool) -> Result<(), CliError> {
    let ingestor = Ingestor::new(store, config);
    let stdin = io::stdin();
    let mut captured = 0usize;
    let mut skipped = 0usize;

    for line in stdin.lock().lines() {
        let line = line?;
        let code = line.trim();
        if code.is_empty() {
            continue;
        }

        let outcome = if force {
            ingestor.ingest_forced(code).await
        } else {
            ingestor.ingest(code).await
        };

        match outcome {
            Ok(ingested) => {
                report_capture(&ingested);
                captured += 1;
            }
            Err(Error::Duplicate { tracking }) => {
                println!("Skipped {tracking}: already scanned today");
                skipped += 1;
            }
            Err(Error::InvalidInput(reason)) => {
                println!("Skipped {code:?}: {reason}");
                skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("Captured {captured} scans, skipped {skipped}");
    Ok(())
}

fn report_capture(ingested: &Ingested) {
    let scan = &ingested.scan;
    println!(
        "Captured {} at {} [{}]",
        scan.tracking,
        format_timestamp(scan.timestamp),
        scan.id
    );
    if ingested.feedback.audio {
        // Terminal bell stands in for the audio cue.
        print!("\x07");
        let _ = io::stdout().flush();
    }
}
