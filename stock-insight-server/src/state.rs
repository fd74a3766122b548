use std::sync::Arc;
use stock_insight::{CorrelationOrchestrator, Ticker};

/// Shared application state, passed to all route handlers via `axum::extract::State`.
///
/// Immutable once built: requests share no mutable state.
#[derive(Debug)]
pub struct AppState {
    pub orchestrator: CorrelationOrchestrator,
    /// Default ticker set of the matrix route.
    pub heatmap_tickers: Vec<Ticker>,
}

impl AppState {
    pub fn new(orchestrator: CorrelationOrchestrator, heatmap_tickers: Vec<Ticker>) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            heatmap_tickers,
        })
    }
}
