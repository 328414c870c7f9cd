//! Parcelscan CLI - capture, store, and verify parcel tracking codes.
//!
//! Quick capture from the terminal: `parcelscan 1Z999AA10123456784`.

mod cli;
mod commands;
mod error;

use std::env;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::common::{AnyStore, StoreMode};
use crate::commands::{config, delete, export, import, list, scan, search, verify};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parcelscan=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mode = StoreMode::from_flags(
        cli.remote.or_else(|| env_url("PARCELSCAN_REMOTE_URL")),
        cli.mirror.or_else(|| env_url("PARCELSCAN_MIRROR_URL")),
    );
    let db_path = resolve_db_path(cli.db_path);
    tracing::debug!(db = %db_path.display(), "opening store");
    let store = AnyStore::open(mode, &db_path)?;

    match cli.command {
        Some(Commands::Scan { force }) => {
            let config = store.load_config().await?;
            scan::stream(&store, config, force).await?;
        }
        Some(Commands::Add { code, force }) => {
            let config = store.load_config().await?;
            scan::add(&store, config, &code, force).await?;
        }
        Some(Commands::List { limit, json }) => list::list(&store, limit, json).await?,
        Some(Commands::Search { term, json }) => search::search(&store, &term, json).await?,
        Some(Commands::Verify { text, file, json }) => {
            verify::verify(&store, text, file, json).await?;
        }
        Some(Commands::Check { ids }) => delete::set_checked(&store, &ids, true).await?,
        Some(Commands::Uncheck { ids }) => delete::set_checked(&store, &ids, false).await?,
        Some(Commands::Delete { ids }) => delete::delete(&store, &ids).await?,
        Some(Commands::Clear { yes }) => delete::clear(&store, yes).await?,
        Some(Commands::Export {
            format,
            output,
            stdout,
        }) => export::export(&store, format.into(), output, stdout).await?,
        Some(Commands::Import { path }) => import::import(&store, &path).await?,
        Some(Commands::Stats) => list::stats(&store).await?,
        Some(Commands::Config { action }) => config::config(&store, action).await?,
        None => {
            // Quick capture mode: parcelscan 1Z999AA1
            if cli.code.is_empty() {
                Cli::command().print_help()?;
                println!();
            } else {
                let config = store.load_config().await?;
                scan::add(&store, config, &cli.code.join(" "), false).await?;
            }
        }
    }

    Ok(())
}

fn env_url(name: &str) -> Option<String> {
    env::var(name).ok().filter(|url| !url.is_empty())
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PARCELSCAN_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parcelscan")
        .join("scans.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_db_path_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db")));
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn default_db_path_ends_with_app_dir() {
        let path = default_db_path();
        assert!(path.ends_with("parcelscan/scans.db"));
    }
}
