//! Client for the stock-insight-server HTTP API.

use serde::{Deserialize, de::DeserializeOwned};
use std::{collections::HashMap, time::Duration};
use stock_insight::{Ticker, WindowMinutes, model::PriceSample};
use url::Url;

pub type ApiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub const ENV_STOCK_API_URL: &str = "STOCK_API_URL";
pub const DEFAULT_STOCK_API_URL: &str = "http://127.0.0.1:3001";

/// `GET /stocks/{ticker}` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AveragePrice {
    pub average_stock_price: f64,
    pub price_history: Vec<PriceSample>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCell {
    pub ticker_a: Ticker,
    pub ticker_b: Ticker,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixStats {
    pub average_price: f64,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixError {
    pub ticker_a: Ticker,
    pub ticker_b: Ticker,
    pub error: String,
}

/// `GET /stockcorrelation/matrix` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Matrix {
    pub minutes: WindowMinutes,
    pub tickers: Vec<Ticker>,
    pub cells: Vec<MatrixCell>,
    pub stats: HashMap<Ticker, MatrixStats>,
    pub errors: Vec<MatrixError>,
}

impl Matrix {
    /// Correlation of `x` and `y` in either order. Diagonal cells are `None`, the
    /// heatmap leaves them blank.
    pub fn correlation(&self, x: &Ticker, y: &Ticker) -> Option<f64> {
        self.cells
            .iter()
            .find(|cell| {
                (&cell.ticker_a == x && &cell.ticker_b == y)
                    || (&cell.ticker_a == y && &cell.ticker_b == x)
            })
            .map(|cell| cell.correlation)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Server url from `STOCK_API_URL`, falling back to the local default.
    pub fn from_env() -> ApiResult<Self> {
        let raw = std::env::var(ENV_STOCK_API_URL)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STOCK_API_URL.to_string());

        Ok(Self::new(Url::parse(&raw)?))
    }

    pub fn average_price_url(&self, ticker: &Ticker, window: WindowMinutes) -> ApiResult<Url> {
        let mut url = self.base_url.join(&format!("stocks/{ticker}"))?;
        url.query_pairs_mut()
            .append_pair("minutes", &window.to_string());
        Ok(url)
    }

    pub fn matrix_url(&self, tickers: &[Ticker], window: WindowMinutes) -> ApiResult<Url> {
        let mut url = self.base_url.join("stockcorrelation/matrix")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("minutes", &window.to_string());
            for ticker in tickers {
                query.append_pair("ticker", ticker.as_str());
            }
        }
        Ok(url)
    }

    pub async fn average_price(
        &self,
        ticker: &Ticker,
        window: WindowMinutes,
    ) -> ApiResult<AveragePrice> {
        self.get(self.average_price_url(ticker, window)?).await
    }

    pub async fn matrix(&self, tickers: &[Ticker], window: WindowMinutes) -> ApiResult<Matrix> {
        self.get(self.matrix_url(tickers, window)?).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "unexpected response".to_string());
            return Err(format!("HTTP {}: {}", status.as_u16(), message).into());
        }

        Ok(response.json::<T>().await?)
    }
}
