//! Encore email webhook service.
//!
//! Main entry point. Loads configuration, prepares the database and
//! serves provider webhooks until shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use encore_api::{AppState, Config};
use encore_core::storage::{self, Storage};
use encore_webhooks::PostgresEmailEventStorage;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config)?;

    info!("Starting Encore email webhook service");
    info!(
        database_url = %config.database_url_masked(),
        host = %config.host,
        port = config.port,
        max_connections = config.database_max_connections,
        signature_verification = config.signature_verification_enabled(),
        "Configuration loaded"
    );

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    storage::run_migrations(&db_pool).await.context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let event_storage =
        Arc::new(PostgresEmailEventStorage::new(Arc::new(Storage::new(db_pool.clone()))));
    let state = AppState::new(event_storage, config.api_settings());
    let addr = config.parse_server_addr()?;

    info!(addr = %addr, "Encore is ready to receive webhooks");

    encore_api::start_server(state, addr).await.context("HTTP server failed")?;

    db_pool.close().await;
    info!("Database connections closed");

    info!("Encore shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
///
/// `RUST_LOG` wins over the configured level; both fall back to the
/// service default.
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log))
        .or_else(|_| EnvFilter::try_new("info,encore=debug,tower_http=debug"))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);
    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .max_lifetime(Duration::from_secs(config.database_max_lifetime))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
