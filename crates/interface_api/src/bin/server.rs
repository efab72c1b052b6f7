//! Demurrage API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin demurrage-api
//!
//! # Run with environment variables
//! DEMURRAGE_PORT=8080 DEMURRAGE_DATABASE_URL=postgres://... cargo run --bin demurrage-api
//! ```
//!
//! # Environment Variables
//!
//! * `DEMURRAGE_HOST` / `DEMURRAGE_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `DEMURRAGE_DATABASE_URL` - PostgreSQL connection string
//! * `DEMURRAGE_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `DEMURRAGE_JWT_SECRET` - Admin JWT signing secret (required in production)
//! * `DEMURRAGE_TIMEZONE` - Business timezone for "today" (default: UTC)
//! * `DEMURRAGE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! * `DEMURRAGE_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `DEMURRAGE_LOG_FORMAT` - pretty or json (default: pretty)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_demurrage::SystemClock;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresDemurrageAdapter};
use interface_api::config::{ApiConfig, LogFormat};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone,
        "Starting demurrage API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone()).max_connections(config.database_max_connections),
    )
    .await
    .context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;

    let clock = SystemClock::new(config.timezone()?);
    let port = PostgresDemurrageAdapter::new(pool);
    let state = AppState::new(Arc::new(port), Arc::new(clock), config.clone());
    let app = create_router(state);

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Installs the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
