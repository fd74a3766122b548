#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Stock-Insight
//! Average prices and pairwise Pearson correlations of stock tickers over a trailing
//! window of minutes, computed from price histories fetched on demand.
//!
//! ## Overview
//! * [`PriceHistoryClient`](client::PriceHistoryClient): source of [`PriceSeries`](model::PriceSeries),
//!   with an HTTP implementation for the upstream price provider.
//! * [`statistics`]: mean, sample standard deviation, covariance and Pearson correlation.
//! * [`CorrelationOrchestrator`](orchestrator::CorrelationOrchestrator): fetches concurrently
//!   and produces [`TickerStats`](model::TickerStats), [`CorrelationResult`](model::CorrelationResult)s
//!   and [`CorrelationMatrix`](model::CorrelationMatrix)es.
//!
//! No price data is cached: every operation fetches the histories it needs.

/// [`StockError`](error::StockError) and [`FetchCause`](error::FetchCause).
pub mod error;

/// Validated domain types: [`Ticker`](model::Ticker), [`WindowMinutes`](model::WindowMinutes),
/// price series and correlation outputs.
pub mod model;

/// Pure numeric functions over price slices.
pub mod statistics;

/// Environment driven provider and orchestrator configuration.
pub mod config;

/// Upstream price history clients.
pub mod client;

/// Concurrent fetch and correlation orchestration.
pub mod orchestrator;

pub use error::{FetchCause, StockError};
pub use model::{CorrelationMatrix, CorrelationResult, Ticker, TickerStats, WindowMinutes};
pub use orchestrator::CorrelationOrchestrator;
