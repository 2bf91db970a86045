use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;

use dexlite_backend::config::AppConfig;
use dexlite_backend::external::hyperliquid::HyperliquidProvider;
use dexlite_backend::logging::{init_logging, LoggingConfig};
use dexlite_backend::services::job_scheduler_service::JobContext;
use dexlite_backend::store::PgPriceStore;
use dexlite_backend::supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: could not load .env file: {}", e);
    }

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).context("failed to initialize logging")?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        port = config.port,
        coins = ?config.tracked_coins,
        fetch_interval_secs = config.fetch_interval.as_secs(),
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        retention_hours = config.retention.num_hours(),
        "Configuration loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to migrate database")?;
    tracing::info!("Database initialized and migrated successfully");

    let provider = HyperliquidProvider::new(&config.hyperliquid_api_url, config.upstream_timeout)
        .context("failed to create Hyperliquid client")?;
    tracing::info!(url = provider.base_url(), "Price provider ready");

    let context = JobContext {
        store: Arc::new(PgPriceStore::new(pool)),
        price_provider: Arc::new(provider),
        tracked_coins: Arc::from(config.tracked_coins.clone()),
        retention: config.retention,
    };

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;

    supervisor::run(&config, listener, context, shutdown_signal()).await
}

/// Resolves on SIGINT or SIGTERM.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
