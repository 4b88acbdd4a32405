//! Brolly CLI - Command-line interface for the lending pool

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "brolly")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "./data/brolly.db")]
    db_path: PathBuf,

    /// Keep state in memory instead of SQLite (lost on exit)
    #[arg(long)]
    memory: bool,

    /// Number of items in the pool
    #[arg(long, default_value_t = 21)]
    pool_size: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8780")]
        bind: SocketAddr,
    },

    /// Show pool availability and per-item state
    Status,

    /// Show recent lending activity
    Activities {
        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Create the full pool of items
    Init,

    /// Wipe items and activities and recreate the pool
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let engine = commands::open_engine(&cli.db_path, cli.memory, cli.pool_size)?;

    // Execute command
    match cli.command {
        Commands::Serve { bind } => {
            commands::serve::execute(engine, bind)?;
        }
        Commands::Status => {
            commands::status::execute(&engine)?;
        }
        Commands::Activities { limit } => {
            commands::status::activities(&engine, limit)?;
        }
        Commands::Init => {
            commands::admin::init(&engine)?;
        }
        Commands::Reset => {
            commands::admin::reset(&engine)?;
        }
    }

    Ok(())
}
