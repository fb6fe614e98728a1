//! Kalah server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use kalah_server::api::{self, AppState};
use kalah_server::{MatchService, MatchStore, MemoryStore, ServerConfig, SqliteStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    }
    .with_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    match cli.command {
        Command::Serve {
            port,
            host,
            database,
        } => serve(config.with_overrides(host, port, database)).await,
        Command::Migrate { database } => migrate(config.with_overrides(None, None, database)),
    }
}

/// Run the HTTP and WebSocket server until Ctrl-C.
#[instrument(skip(config))]
async fn serve(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn MatchStore> = match config.database() {
        Some(path) => Arc::new(SqliteStore::open(path)?),
        None => {
            warn!("No database configured, matches are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let app = api::router(AppState::new(MatchService::new(store)));
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Kalah server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

/// Apply pending migrations and exit.
#[instrument(skip(config))]
fn migrate(config: ServerConfig) -> Result<()> {
    let path = config
        .database()
        .as_deref()
        .context("migrate needs a database path (--database, config file or DATABASE_URL)")?;
    let applied = SqliteStore::migrate(path)?;
    info!(path, applied, "Migrations complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
