mod config;
mod error;
mod routes;
mod state;

use config::{LogFormat, ServerConfig};
use state::AppState;
use std::sync::Arc;
use stock_insight::{
    CorrelationOrchestrator, StockError,
    client::HttpPriceHistoryClient,
    config::{OrchestratorConfig, ProviderConfig},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Environment is read once, `.env` values never override the process environment
    let dotenv = dotenv::dotenv();

    init_logging(LogFormat::from_env());

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(error) => info!(%error, "no .env loaded"),
    }

    if let Err(error) = run().await {
        error!(%error, "stock-insight-server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StockError> {
    let provider = ProviderConfig::from_env()?;
    let orchestrator_config = OrchestratorConfig::from_env()?;
    let server = ServerConfig::from_env()?;
    let addr = server.socket_addr()?;

    info!(
        base_url = %provider.base_url,
        authenticated = !provider.token.is_empty(),
        fetch_timeout_ms = orchestrator_config.fetch_timeout.as_millis() as u64,
        max_attempts = orchestrator_config.retry.max_attempts,
        heatmap_tickers = ?server.heatmap_tickers,
        "starting stock-insight-server"
    );

    let client = HttpPriceHistoryClient::new(provider);
    let orchestrator =
        CorrelationOrchestrator::new(Arc::new(client)).with_config(orchestrator_config);

    let app = routes::router(AppState::new(orchestrator, server.heatmap_tickers));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|error| StockError::Config(format!("failed to bind {addr}: {error}")))?;

    info!("stock-insight-server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| StockError::Config(format!("server error: {error}")))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, gracefully stopping"),
        Err(error) => {
            error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
