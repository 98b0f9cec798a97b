mod api;
mod batch;
mod client;
mod config;
mod directory;
mod dispatch;
mod error;
mod gateway;
mod policy;
mod resolve;
mod security;

use crate::api::{
    compat_check, export_context, health_check, import_context, invoke, list_registries,
    run_batch, GatewayState,
};
use crate::config::Config;
use crate::directory::RegistryDirectory;
use crate::gateway::Gateway;
use crate::security::IpFilterLayer;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup log directory
    let log_dir =
        std::env::var("LOG_DIR").unwrap_or_else(|_| "/var/log/schema-registry-gateway".to_string());

    std::fs::create_dir_all(&log_dir).unwrap_or_else(|e| {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir, e);
    });

    // File appender with daily rotation
    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &log_dir, "schema-registry-gateway.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Logging to both stdout and file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,schema_registry_gateway=debug")),
        )
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", log_dir);

    // Load environment from .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file found or error loading it: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;
    let socket_addr = config.socket_addr()?;

    // The directory is validated before the gateway starts serving: an
    // invalid registry set must never begin accepting calls.
    let directory = match RegistryDirectory::from_config(&config) {
        Ok(directory) => directory,
        Err(e) => {
            error!("Invalid registry configuration: {}", e);
            return Err(anyhow::anyhow!(e.to_string()));
        }
    };

    info!("Starting Schema Registry Gateway on {}", socket_addr);
    info!(
        "Configured registries: {:?} (default: {})",
        directory.names(),
        directory.default_name()
    );
    info!("Global read-only mode: {}", config.global_read_only);
    info!(
        "Request timeout: {:?}, retry count: {}",
        config.request_timeout, config.retry_count
    );
    info!("Allowed networks: {:?}", config.allowed_networks);

    let ip_filter = IpFilterLayer::new(config.allowed_networks.clone());
    let state = Arc::new(GatewayState::new(Gateway::new(&config, directory)));

    // Health check stays outside the IP filter for load balancers.
    let app = Router::new()
        .route("/health", get(health_check).with_state(state.clone()))
        .merge(
            Router::new()
                .route("/registries", get(list_registries))
                .route("/invoke", post(invoke))
                .route("/batch", post(run_batch))
                .route("/export", post(export_context))
                .route("/import", post(import_context))
                .route("/compat-check", post(compat_check))
                .layer(ip_filter)
                .with_state(state),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
