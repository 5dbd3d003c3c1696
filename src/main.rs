//! Pulse Gateway - expiring cache and resilient upstream fetcher behind HTTP
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load and validate configuration from environment variables
//! 3. Build the application context (cache, fetcher, metrics)
//! 4. Serve the Axum router on the configured port
//! 5. Handle graceful shutdown on SIGINT/SIGTERM

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_gateway::api::create_router;
use pulse_gateway::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pulse Gateway");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Configuration loaded: base_url={}, timeout={}ms, retries={}, retry_delay={}ms, cache_ttl={}s, max_entries={}, port={}",
        config.api_base_url,
        config.api_timeout_ms,
        config.max_retries,
        config.retry_delay_ms,
        config.cache_ttl,
        config.max_entries,
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to build application state")?;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
