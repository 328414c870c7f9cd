use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "parcelscan")]
#[command(about = "Scan, store, and verify parcel tracking codes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Remote-only mode: the scans service at URL is the sole store
    #[arg(long, global = true, value_name = "URL", conflicts_with = "mirror")]
    pub remote: Option<String>,

    /// Dual-write mode: replicate local writes to the scans service at URL
    #[arg(long, global = true, value_name = "URL")]
    pub mirror: Option<String>,

    /// Quick capture: parcelscan 1Z999AA1
    #[arg(trailing_var_arg = true)]
    pub code: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture scans from stdin, one decoded code per line
    Scan {
        /// Keep same-day duplicates instead of skipping them
        #[arg(long)]
        force: bool,
    },
    /// Record a single tracking code
    Add {
        /// Tracking code (normalized before storage)
        code: String,
        /// Insert even if the code was already scanned today
        #[arg(long)]
        force: bool,
    },
    /// List recent scans, newest first
    List {
        /// Number of scans to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Substring search over tracking codes
    Search {
        /// Search term (normalized before matching)
        term: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify a batch of codes (newline/comma/semicolon separated)
    Verify {
        /// Codes as inline text; omit to read from --file
        text: Option<String>,
        /// Read codes from a file instead
        #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark scans as verified
    Check {
        /// Scan ids
        ids: Vec<String>,
    },
    /// Clear the verified flag on scans
    Uncheck {
        /// Scan ids
        ids: Vec<String>,
    },
    /// Delete scans by id
    Delete {
        /// Scan ids
        ids: Vec<String>,
    },
    /// Delete every scan
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Export all scans
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormatArg::Csv)]
        format: ExportFormatArg,
        /// Output path; a conventional name in the current directory when omitted
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
    /// Import scans from a .csv or .json file
    Import {
        /// File to import (max 10MB)
        path: PathBuf,
    },
    /// Show scan counts
    Stats,
    /// Get or set device configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Get,
    /// Set the device name stamped onto captured scans
    DeviceName { name: String },
    /// Enable or disable the audio cue on capture
    Audio {
        #[arg(value_parser = clap::value_parser!(bool))]
        enabled: bool,
    },
    /// Enable or disable the haptic pulse on capture
    Haptic {
        #[arg(value_parser = clap::value_parser!(bool))]
        enabled: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Json,
}

impl From<ExportFormatArg> for parcelscan_core::transfer::ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Csv => Self::Delimited,
            ExportFormatArg::Json => Self::Structured,
        }
    }
}
