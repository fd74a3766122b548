use crate::{
    config::ProviderConfig,
    error::{FetchCause, StockError},
    model::{PriceSample, PriceSeries, Ticker, WindowMinutes},
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Source of [`PriceSeries`] for a ticker over a trailing window.
///
/// Implementations must not cache between calls and must not retry; both are
/// decided by the caller.
#[async_trait]
pub trait PriceHistoryClient: Send + Sync {
    async fn fetch(&self, ticker: &Ticker, window: WindowMinutes) -> Result<PriceSeries, StockError>;
}

/// Body shapes the upstream provider replies with.
///
/// ### Raw Payload Examples
/// Price history over a window:
/// ```json
/// [
///     { "price": 231.95, "lastUpdatedAt": "2025-05-08T04:11:42.465706306Z" },
///     { "price": 124.95, "lastUpdatedAt": "2025-05-08T04:12:42.465706306Z" }
/// ]
/// ```
///
/// Latest price only:
/// ```json
/// { "stock": { "price": 666.66, "lastUpdatedAt": "2025-05-08T04:26:27.4658491Z" } }
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderPayload {
    History(Vec<PriceSample>),
    Latest { stock: PriceSample },
    Sample(PriceSample),
}

impl ProviderPayload {
    fn into_samples(self) -> Vec<PriceSample> {
        match self {
            ProviderPayload::History(samples) => samples,
            ProviderPayload::Latest { stock } => vec![stock],
            ProviderPayload::Sample(sample) => vec![sample],
        }
    }
}

/// Decode a provider body into chronologically ordered samples.
fn decode_samples(body: &[u8]) -> Result<Vec<PriceSample>, FetchCause> {
    let samples = serde_json::from_slice::<ProviderPayload>(body)
        .map_err(|error| FetchCause::Decode(error.to_string()))?
        .into_samples();

    if let Some(sample) = samples.iter().find(|sample| !sample.price.is_finite()) {
        return Err(FetchCause::Decode(format!(
            "non-finite price at {}",
            sample.observed_at
        )));
    }

    if !samples
        .windows(2)
        .all(|pair| pair[0].observed_at <= pair[1].observed_at)
    {
        return Err(FetchCause::Decode(
            "samples are not in chronological order".to_string(),
        ));
    }

    Ok(samples)
}

/// [`PriceHistoryClient`] backed by the upstream provider's HTTP API.
///
/// Sends `GET {base_url}/stocks/{ticker}?minutes={window}` with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpPriceHistoryClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl HttpPriceHistoryClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    pub fn with_http_client(http: reqwest::Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Url of the price history resource for the provided ticker & window.
    pub fn history_url(&self, ticker: &Ticker, window: WindowMinutes) -> Url {
        let mut url = self.config.base_url.clone();

        // ProviderConfig guarantees base_url can be a base
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("stocks").push(ticker.as_str());
        }

        url.query_pairs_mut()
            .clear()
            .append_pair("minutes", &window.to_string());
        url
    }

    async fn fetch_samples(&self, url: Url) -> Result<Vec<PriceSample>, FetchCause> {
        let mut request = self.http.get(url).timeout(self.config.request_timeout);
        if !self.config.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.config.token));
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.bytes().await?;

        decode_samples(&body)
    }
}

#[async_trait]
impl PriceHistoryClient for HttpPriceHistoryClient {
    async fn fetch(&self, ticker: &Ticker, window: WindowMinutes) -> Result<PriceSeries, StockError> {
        let url = self.history_url(ticker, window);
        debug!(%ticker, minutes = window.get(), %url, "fetching price history");

        match self.fetch_samples(url).await {
            Ok(samples) => {
                debug!(%ticker, samples = samples.len(), "fetched price history");
                Ok(PriceSeries::new(ticker.clone(), window, samples))
            }
            Err(cause) => {
                warn!(%ticker, minutes = window.get(), %cause, "price history fetch failed");
                Err(StockError::upstream(ticker, cause))
            }
        }
    }
}
