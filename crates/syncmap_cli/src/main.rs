//! SyncMap CLI
//!
//! Command-line tools for inspecting and repairing a profile's record
//! mapping store.
//!
//! # Commands
//!
//! - `inspect` - Display store size and entry counts
//! - `dump` - Print every raw entry
//! - `lookup` - Resolve a local id or an object id
//! - `pending` - Show a not-synced set
//! - `reset-key` - Delete one raw record key
//! - `destroy` - Remove the store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use syncmap_core::{RecordAction, RecordCategory};
use tracing_subscriber::EnvFilter;

/// SyncMap record mapping store tools.
#[derive(Parser)]
#[command(name = "syncmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the profile directory holding `sync_object_map`
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store size and entry counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every raw entry of both namespaces
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve a local id to its object id, or an object id to its local id
    Lookup {
        /// Record category (bookmark, history, unset)
        #[arg(short, long)]
        category: RecordCategory,

        /// Local id to resolve
        #[arg(short, long, conflicts_with = "object_id", required_unless_present = "object_id")]
        local_id: Option<String>,

        /// Object id to resolve
        #[arg(short, long)]
        object_id: Option<String>,
    },

    /// Show the not-synced set of a category and action
    Pending {
        /// Record category (bookmark, history)
        #[arg(short, long)]
        category: RecordCategory,

        /// Pending action (create, update, delete or 0, 1, 2)
        #[arg(short, long)]
        action: RecordAction,
    },

    /// Delete one raw key from the records namespace
    ResetKey {
        /// Raw key to delete
        key: String,
    },

    /// Remove the store from the profile
    Destroy {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Profile path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Dump { format } => {
            let path = cli.path.ok_or("Profile path required for dump")?;
            commands::dump::run(&path, &format)?;
        }
        Commands::Lookup {
            category,
            local_id,
            object_id,
        } => {
            let path = cli.path.ok_or("Profile path required for lookup")?;
            let target = match (local_id, object_id) {
                (Some(local_id), _) => commands::lookup::Target::LocalId(local_id),
                (None, Some(object_id)) => commands::lookup::Target::ObjectId(object_id),
                (None, None) => return Err("Either --local-id or --object-id is required".into()),
            };
            commands::lookup::run(&path, category, target)?;
        }
        Commands::Pending { category, action } => {
            let path = cli.path.ok_or("Profile path required for pending")?;
            commands::pending::run(&path, category, action)?;
        }
        Commands::ResetKey { key } => {
            let path = cli.path.ok_or("Profile path required for reset-key")?;
            commands::reset_key::run(&path, &key)?;
        }
        Commands::Destroy { yes } => {
            let path = cli.path.ok_or("Profile path required for destroy")?;
            if !yes {
                return Err("Refusing to destroy the store without --yes".into());
            }
            commands::destroy::run(&path)?;
        }
        Commands::Version => {
            println!("SyncMap CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
