use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod storage;

use config::Config;
use shared::observability::{init_logging, production_log_config, LogConfig};
use storage::{AzureBlobClient, BlobStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("APP_ENV").as_deref() != Ok("production") {
        dotenvy::dotenv().ok();
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let log_config = if config.is_production() {
        production_log_config(env!("CARGO_PKG_NAME"), config.logging.level)
    } else {
        LogConfig {
            level: config.logging.level,
            format: config.logging.format,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            ..LogConfig::default()
        }
    };
    init_logging(log_config).context("Failed to initialize logging")?;

    info!("Starting Blob Gateway...");

    let client = AzureBlobClient::from_connection_string(&config.storage.connection_string)
        .context("Failed to initialize storage client")?;
    info!(account = %client.account_name(), "Storage client initialized");

    if config.storage.account_name.is_none() {
        warn!("AZURE_STORAGE_ACCOUNT_NAME is not set; container creation will fail");
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = AppState {
        store: Arc::new(client),
        config: Arc::new(config),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Blob Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Blob Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
