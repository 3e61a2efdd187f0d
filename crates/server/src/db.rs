use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use shelfsync_core::config::PostgresConfig;

/// Create the PostgreSQL connection pool.
pub async fn connect(config: &PostgresConfig) -> anyhow::Result<PgPool> {
    let url = config.database_url()?;
    let target = config.redacted_target().unwrap_or_default();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await
        .with_context(|| format!("connecting to PostgreSQL at {target}"))?;

    info!(target = %target, max_connections = config.max_connections, "PostgreSQL connected");
    Ok(pool)
}

/// Apply pending migrations from `migrations/`.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("applying database migrations")?;
    info!("Database migrations applied successfully");
    Ok(())
}
