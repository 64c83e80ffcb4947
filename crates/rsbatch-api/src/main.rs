//! rsbatch Server Binary
//!
//! HTTP batch endpoint that fans sub-requests out to an upstream service.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! rsbatch --config config.yaml
//!
//! # With environment variables only
//! RSBATCH_DISPATCH__UPSTREAM_URL=http://api.internal:3000 rsbatch
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::info;

use rsbatch_api::adapters::HttpDispatcher;
use rsbatch_api::http::{
    create_router_with_config, create_router_with_observability, AppState, RouterConfig,
};
use rsbatch_api::observability::{init_logging, init_metrics, LoggingConfig};
use rsbatch_server::ServerConfig;

/// rsbatch - batch request orchestrator
#[derive(Parser, Debug)]
#[command(name = "rsbatch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig::from(&config.logging));

    info!(version = env!("CARGO_PKG_VERSION"), "Starting rsbatch server");

    let dispatcher = HttpDispatcher::new(
        &config.dispatch.upstream_url,
        Duration::from_secs(config.dispatch.timeout_secs),
    )?;
    info!(
        upstream = %dispatcher.base_url(),
        timeout_secs = config.dispatch.timeout_secs,
        "Dispatching sub-requests upstream"
    );

    let state = AppState::with_config(Arc::new(dispatcher), config.batch.handler_config());
    let router_config = RouterConfig::from(&config.batch);
    info!(
        endpoint = %router_config.endpoint,
        max_batch_size = config.batch.max_batch_size,
        "Batch endpoint configured"
    );

    let router = if config.metrics.enabled {
        let metrics_state = init_metrics()?;
        info!("Metrics enabled at /metrics");
        create_router_with_observability(state, metrics_state, router_config)
    } else {
        create_router_with_config(state, router_config)
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    run_http_server(router, addr).await
}

/// Run the HTTP server with graceful shutdown.
async fn run_http_server(router: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
