//! # Aula API server
//!
//! ```text
//! load config ──► open SQLite (migrations) ──► build router ──► serve
//!                                                                 │
//!                                          Ctrl+C / SIGTERM ──► drain, close pool
//! ```

use std::sync::Arc;

use anyhow::Context;
use aula_api::{router, ApiConfig, AppState};
use aula_db::Database;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aula_api=debug,aula_db=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Aula API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    let addr = config.socket_addr()?;
    info!(%addr, database = %config.database_path, "Configuration loaded");
    if config.uses_dev_secret() {
        warn!("AULA_JWT_SECRET is not set; using the development secret");
    }

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening database at {}", config.database_path))?;
    info!("Database ready");

    let state = Arc::new(AppState::new(db.clone(), config));
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
