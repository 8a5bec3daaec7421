//! cpsync CLI
//!
//! Drives the sync engine against a JSON state file holding local entities
//! and an in-memory remote control plane.
//!
//! # Commands
//!
//! - `apply` - Reconcile every entity in the state file once
//! - `status` - Show remote identities and sync freshness
//! - `version` - Show version information

mod commands;
mod state;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Remote entity synchronization tools.
#[derive(Parser)]
#[command(name = "cpsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every entity in the state file once
    Apply {
        /// Path to the state file
        #[arg(short, long)]
        state: PathBuf,

        /// Sync period in seconds
        #[arg(long)]
        sync_period: Option<u64>,
    },

    /// Show remote identities and sync freshness
    Status {
        /// Path to the state file
        #[arg(short, long)]
        state: PathBuf,

        /// Sync period in seconds
        #[arg(long)]
        sync_period: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Apply { state, sync_period } => {
            commands::apply::run(&state, sync_period.map(Duration::from_secs))?;
        }
        Commands::Status {
            state,
            sync_period,
            format,
        } => {
            commands::status::run(&state, sync_period.map(Duration::from_secs), &format)?;
        }
        Commands::Version => {
            println!("cpsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("cpsync core v{}", cpsync_core::VERSION);
        }
    }

    Ok(())
}
