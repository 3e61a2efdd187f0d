//! shelfsync-server: webhook receiver that replaces the product catalog
//! from object-storage payloads.

mod api;
mod db;
mod pg_store;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use shelfsync_core::config::{load_dotenv, Config};
use shelfsync_ingest::Orchestrator;
use shelfsync_storage::ObjectStoreFetcher;

use crate::pg_store::PgCatalogStore;
use crate::state::AppState;

// ── CLI ─────────────────────────────────────────────────────────────

/// Catalog ingestion service for S3/MinIO bucket notifications.
#[derive(Parser, Debug)]
#[command(name = "shelfsync-server", version, about)]
struct Cli {
    /// Configuration profile (prefix for environment keys).
    #[arg(long, env = "SHELFSYNC_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.log_summary();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Migrate => {
            let pool = db::connect(&config.postgres).await?;
            db::migrate(&pool).await?;
            pool.close().await;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.profile {
        Some(profile) => Config::from_lookup(profile, &|key| std::env::var(key).ok()),
        None => Config::from_env(),
    };
    config.context("invalid configuration")
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.postgres).await?;
    db::migrate(&pool).await?;

    let fetcher = Arc::new(ObjectStoreFetcher::s3(config.aws.clone()));
    let store = Arc::new(PgCatalogStore::new(pool.clone()));
    let orchestrator = Orchestrator::new(fetcher, store, &config.ingest);
    let state = Arc::new(AppState::new(orchestrator, config.ingest.clone()));

    let app = router::build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    info!("shutdown signal received");
}
