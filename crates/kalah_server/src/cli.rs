//! Command-line interface for the kalah server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kalah - match server with REST and WebSocket interface
#[derive(Parser, Debug)]
#[command(name = "kalah")]
#[command(about = "Kalah match server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// SQLite database file (in-memory store when omitted)
        #[arg(long)]
        database: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate {
        /// SQLite database file
        #[arg(long)]
        database: Option<String>,
    },
}
