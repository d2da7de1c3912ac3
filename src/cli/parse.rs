//! CLI parse: clap types for sweep. No behavior; definitions only.

use crate::types::RecordType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sweep CLI - batched, verified bulk deletion of products and orders
#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "Batched, verified bulk deletion of catalog products and orders")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory holding the store and config/
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of a remote `sweep serve` instance
    #[arg(long)]
    pub server: Option<String>,

    /// Access token presented to the cleanup server
    #[arg(long)]
    pub token: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q', default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how many products and orders exist
    Counts {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete every record of one type in verified batches
    Delete {
        /// Record type: products or orders
        record_type: RecordType,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Fill the local store with sample records
    Seed {
        #[arg(long, default_value = "0")]
        products: u64,
        /// Variations attached to each variable product
        #[arg(long, default_value = "0")]
        variations: u64,
        #[arg(long, default_value = "0")]
        orders: u64,
        /// Line items attached to each order
        #[arg(long, default_value = "0")]
        items: u64,
        /// Records of each type marked undeletable
        #[arg(long, default_value = "0")]
        held: u64,
    },
    /// Serve the cleanup protocol over HTTP
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show recorded runs and skip logs
    Audit {
        /// Only show entries for this record type
        #[arg(long)]
        record_type: Option<RecordType>,
        /// Maximum entries per section
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
