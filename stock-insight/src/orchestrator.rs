use crate::{
    client::PriceHistoryClient,
    config::OrchestratorConfig,
    error::{FetchCause, StockError},
    model::{
        CorrelationMatrix, CorrelationResult, PairFailure, PriceSeries, Ticker, TickerPair,
        TickerStats, WindowMinutes,
    },
    statistics::{mean, pearson_correlation, sample_std_dev},
};
use fnv::FnvHashMap;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared, join_all},
};
use indexmap::IndexSet;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Memoised fetch of one ticker's series, shared by every pair that references it.
type SharedFetch<'a> = Shared<BoxFuture<'a, Result<Arc<PriceSeries>, StockError>>>;

/// Fetches price histories and turns them into [`TickerStats`], [`CorrelationResult`]s and
/// [`CorrelationMatrix`]s.
///
/// Holds no per-request state: every operation owns the series it fetches, so one
/// orchestrator can serve any number of concurrent requests.
#[derive(Clone)]
pub struct CorrelationOrchestrator {
    client: Arc<dyn PriceHistoryClient>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for CorrelationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CorrelationOrchestrator {
    pub fn new(client: Arc<dyn PriceHistoryClient>) -> Self {
        Self {
            client,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Fetch one series, bounded by the configured timeout and retried per the
    /// configured [`RetryPolicy`](crate::config::RetryPolicy).
    async fn fetch(&self, ticker: &Ticker, window: WindowMinutes) -> Result<PriceSeries, StockError> {
        let retry = self.config.retry;
        let mut attempt = 1;

        loop {
            let result =
                match tokio::time::timeout(self.config.fetch_timeout, self.client.fetch(ticker, window))
                    .await
                {
                    Ok(result) => result,
                    Err(_elapsed) => Err(StockError::upstream(ticker, FetchCause::Timeout)),
                };

            match result {
                Err(error) if error.is_transient() && attempt < retry.max_attempts => {
                    warn!(
                        %ticker,
                        attempt,
                        max_attempts = retry.max_attempts,
                        %error,
                        "retrying price history fetch"
                    );
                    attempt += 1;
                    tokio::time::sleep(retry.backoff).await;
                }
                result => return result,
            }
        }
    }

    /// Average price and raw history of one ticker over the window.
    pub async fn average_and_history(
        &self,
        ticker: &Ticker,
        window: WindowMinutes,
    ) -> Result<TickerStats, StockError> {
        let series = self.fetch(ticker, window).await?;
        let stats = ticker_stats(&series)?;

        info!(
            %ticker,
            minutes = window.get(),
            samples = series.len(),
            average = stats.average,
            "computed average price"
        );

        Ok(stats)
    }

    /// Pearson correlation of two tickers over the window, with each side's statistics.
    ///
    /// Correlating a ticker with itself fetches once and yields exactly `1.0`.
    pub async fn correlate(
        &self,
        ticker_a: &Ticker,
        ticker_b: &Ticker,
        window: WindowMinutes,
    ) -> Result<CorrelationResult, StockError> {
        let result = if ticker_a == ticker_b {
            let series = self.fetch(ticker_a, window).await?;
            let stats = ticker_stats(&series)?;
            CorrelationResult {
                ticker_a: ticker_a.clone(),
                ticker_b: ticker_b.clone(),
                coefficient: 1.0,
                stats_a: stats.clone(),
                stats_b: stats,
            }
        } else {
            let (series_a, series_b) =
                futures::try_join!(self.fetch(ticker_a, window), self.fetch(ticker_b, window))?;
            correlate_series(&series_a, &series_b)?
        };

        info!(
            %ticker_a,
            %ticker_b,
            minutes = window.get(),
            coefficient = result.coefficient,
            "computed correlation"
        );

        Ok(result)
    }

    /// One [`CorrelationResult`] per unordered pair of distinct tickers.
    ///
    /// Each ticker is fetched at most once regardless of how many pairs reference it,
    /// and all fetches run concurrently. A pair starts computing as soon as both of its
    /// sides resolve. Failed pairs are recorded in [`CorrelationMatrix::failures`]
    /// rather than failing the whole build.
    pub async fn build_matrix<I>(&self, tickers: I, window: WindowMinutes) -> CorrelationMatrix
    where
        I: IntoIterator<Item = Ticker>,
    {
        let tickers = tickers
            .into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let mut matrix = CorrelationMatrix::new(window, tickers.clone());

        // Scoped to this build only, never shared across requests
        let fetches = tickers
            .iter()
            .map(|ticker| {
                let fetch: SharedFetch<'_> = self
                    .fetch(ticker, window)
                    .map(|result| result.map(Arc::new))
                    .boxed()
                    .shared();
                (ticker.clone(), fetch)
            })
            .collect::<FnvHashMap<_, _>>();

        let pairs = tickers.iter().tuple_combinations::<(_, _)>().map(|(a, b)| {
            let fetch_a = fetches[a].clone();
            let fetch_b = fetches[b].clone();

            async move {
                let pair = TickerPair::new(a.clone(), b.clone());
                let outcome = match futures::join!(fetch_a, fetch_b) {
                    (Ok(series_a), Ok(series_b)) => correlate_series(&series_a, &series_b),
                    (Err(error), _) | (_, Err(error)) => Err(error),
                };
                (pair, outcome)
            }
        });

        for (pair, outcome) in join_all(pairs).await {
            match outcome {
                Ok(result) => {
                    debug!(%pair, coefficient = result.coefficient, "correlated pair");
                    matrix.results.insert(pair, result);
                }
                Err(error) => {
                    warn!(%pair, %error, "failed to correlate pair");
                    matrix.failures.push(PairFailure { pair, error });
                }
            }
        }

        info!(
            tickers = matrix.tickers.len(),
            minutes = window.get(),
            correlated = matrix.results.len(),
            failed = matrix.failures.len(),
            "built correlation matrix"
        );

        matrix
    }
}

/// Average and (when defined) sample standard deviation of one series.
pub fn ticker_stats(series: &PriceSeries) -> Result<TickerStats, StockError> {
    let prices = series.prices();
    let average = mean(&prices)?;
    let stddev = (prices.len() >= 2)
        .then(|| sample_std_dev(&prices))
        .transpose()?;

    Ok(TickerStats {
        ticker: series.ticker.clone(),
        average,
        stddev,
        series: series.clone(),
    })
}

/// Correlate two index-aligned series.
///
/// Unequal lengths are reported as [`StockError::TickerMismatch`] naming both tickers,
/// before any statistics are computed.
pub fn correlate_series(
    series_a: &PriceSeries,
    series_b: &PriceSeries,
) -> Result<CorrelationResult, StockError> {
    if series_a.len() != series_b.len() {
        return Err(StockError::TickerMismatch {
            ticker_a: series_a.ticker.clone(),
            len_a: series_a.len(),
            ticker_b: series_b.ticker.clone(),
            len_b: series_b.len(),
        });
    }

    let stats_a = ticker_stats(series_a)?;
    let stats_b = ticker_stats(series_b)?;
    let coefficient = pearson_correlation(&series_a.prices(), &series_b.prices())?;

    Ok(CorrelationResult {
        ticker_a: series_a.ticker.clone(),
        ticker_b: series_b.ticker.clone(),
        coefficient,
        stats_a,
        stats_b,
    })
}
