use crate::{
    error::{ApiError, public_message},
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    routing::get,
};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use stock_insight::{
    CorrelationMatrix, CorrelationResult, Ticker, TickerStats, WindowMinutes, model::PriceSample,
};
use tower_http::cors::CorsLayer;
use url::form_urlencoded;

// ── Query params ─────────────────────────────────────────────────────────

/// Most distinct tickers one matrix request may name. Fetches grow with n, pairs with n².
pub const MAX_MATRIX_TICKERS: usize = 16;

/// Query string of the stock routes. `ticker` may repeat, so it is parsed by hand
/// rather than through `axum::extract::Query`.
#[derive(Debug, Default, PartialEq)]
struct StockQuery {
    minutes: Option<String>,
    tickers: Vec<String>,
}

impl StockQuery {
    fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match &*key {
                "minutes" if params.minutes.is_none() => params.minutes = Some(value.into_owned()),
                "ticker" => params.tickers.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    fn window(&self) -> Result<WindowMinutes, ApiError> {
        let minutes = self.minutes.as_deref().ok_or_else(|| {
            ApiError::BadRequest("missing required query parameter: minutes".to_string())
        })?;
        Ok(minutes.parse()?)
    }

    fn tickers(&self) -> Result<Vec<Ticker>, ApiError> {
        self.tickers
            .iter()
            .map(|ticker| Ticker::new(ticker).map_err(ApiError::from))
            .collect()
    }
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AveragePriceResponse {
    average_stock_price: f64,
    price_history: Vec<PriceSample>,
}

impl From<TickerStats> for AveragePriceResponse {
    fn from(stats: TickerStats) -> Self {
        Self {
            average_stock_price: stats.average,
            price_history: stats.series.samples,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockSummary {
    average_price: f64,
    price_history: Vec<PriceSample>,
}

#[derive(Debug, Serialize)]
struct CorrelationResponse {
    correlation: f64,
    stocks: IndexMap<Ticker, StockSummary>,
}

impl From<CorrelationResult> for CorrelationResponse {
    fn from(result: CorrelationResult) -> Self {
        let stocks = [result.stats_a, result.stats_b]
            .into_iter()
            .map(|stats| {
                (
                    stats.ticker,
                    StockSummary {
                        average_price: stats.average,
                        price_history: stats.series.samples,
                    },
                )
            })
            .collect();

        Self {
            correlation: result.coefficient,
            stocks,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixCell {
    ticker_a: Ticker,
    ticker_b: Ticker,
    correlation: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixStats {
    average_price: f64,
    stddev: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixError {
    ticker_a: Ticker,
    ticker_b: Ticker,
    error: String,
}

#[derive(Debug, Serialize)]
struct MatrixResponse {
    minutes: WindowMinutes,
    tickers: Vec<Ticker>,
    cells: Vec<MatrixCell>,
    stats: IndexMap<Ticker, MatrixStats>,
    errors: Vec<MatrixError>,
}

impl From<CorrelationMatrix> for MatrixResponse {
    fn from(matrix: CorrelationMatrix) -> Self {
        let mut stats = IndexMap::new();
        let mut cells = Vec::with_capacity(matrix.results.len());

        for (pair, result) in matrix.results {
            for side in [result.stats_a, result.stats_b] {
                stats.entry(side.ticker).or_insert(MatrixStats {
                    average_price: side.average,
                    stddev: side.stddev,
                });
            }
            cells.push(MatrixCell {
                ticker_a: pair.a,
                ticker_b: pair.b,
                correlation: result.coefficient,
            });
        }

        // Keep stats ordered like the ticker set
        stats.sort_by_cached_key(|ticker, _| {
            matrix.tickers.iter().position(|t| t == ticker)
        });

        let errors = matrix
            .failures
            .into_iter()
            .map(|failure| MatrixError {
                error: public_message(&failure.error),
                ticker_a: failure.pair.a,
                ticker_b: failure.pair.b,
            })
            .collect();

        Self {
            minutes: matrix.window,
            tickers: matrix.tickers,
            cells,
            stats,
            errors,
        }
    }
}

// ── Route definitions ────────────────────────────────────────────────────

/// Assemble the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stocks/{ticker}", get(average_price))
        .route("/stockcorrelation", get(correlation))
        .route("/stockcorrelation/matrix", get(correlation_matrix))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /stocks/{ticker}?minutes=N`
async fn average_price(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<AveragePriceResponse>, ApiError> {
    let params = StockQuery::parse(query.as_deref());
    let ticker = Ticker::new(&ticker)?;
    let window = params.window()?;

    let stats = state.orchestrator.average_and_history(&ticker, window).await?;

    Ok(Json(AveragePriceResponse::from(stats)))
}

/// `GET /stockcorrelation?minutes=N&ticker=A&ticker=B`
async fn correlation(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<CorrelationResponse>, ApiError> {
    let params = StockQuery::parse(query.as_deref());
    let window = params.window()?;

    let [ticker_a, ticker_b] = <[Ticker; 2]>::try_from(params.tickers()?).map_err(|tickers| {
        ApiError::BadRequest(format!(
            "exactly two ticker query parameters are required, {} provided",
            tickers.len()
        ))
    })?;

    let result = state
        .orchestrator
        .correlate(&ticker_a, &ticker_b, window)
        .await?;

    Ok(Json(CorrelationResponse::from(result)))
}

/// `GET /stockcorrelation/matrix?minutes=N[&ticker=...]`
///
/// Responds 200 once parameters validate, listing per-pair failures in `errors`.
async fn correlation_matrix(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<MatrixResponse>, ApiError> {
    let params = StockQuery::parse(query.as_deref());
    let window = params.window()?;

    let mut tickers = params.tickers()?;
    if tickers.is_empty() {
        tickers = state.heatmap_tickers.clone();
    }

    let distinct = tickers.iter().collect::<IndexSet<_>>().len();
    if distinct > MAX_MATRIX_TICKERS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_MATRIX_TICKERS} distinct tickers are allowed, {distinct} provided"
        )));
    }

    let matrix = state.orchestrator.build_matrix(tickers, window).await;

    Ok(Json(MatrixResponse::from(matrix)))
}
