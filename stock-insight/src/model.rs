use crate::error::StockError;
use chrono::{DateTime, Utc};
use derive_more::Display;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use std::{num::NonZeroU32, str::FromStr};

/// Maximum accepted length of a ticker symbol.
pub const MAX_TICKER_LEN: usize = 16;

/// Validated ticker symbol (eg/ "NVDA", "BRK.B").
///
/// Surrounding whitespace is trimmed; the remaining symbol must be non-empty, at most
/// [`MAX_TICKER_LEN`] characters and consist of ASCII alphanumerics, `.`, `-` or `_`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
#[serde(transparent)]
pub struct Ticker(SmolStr);

impl Ticker {
    pub fn new(symbol: &str) -> Result<Self, StockError> {
        let symbol = symbol.trim();
        let valid = !symbol.is_empty()
            && symbol.len() <= MAX_TICKER_LEN
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

        if valid {
            Ok(Self(SmolStr::new(symbol)))
        } else {
            Err(StockError::InvalidTicker(symbol.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Ticker {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ticker::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Trailing window of price history, in whole minutes. Always positive.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
#[serde(transparent)]
pub struct WindowMinutes(NonZeroU32);

impl WindowMinutes {
    pub fn new(minutes: u32) -> Result<Self, StockError> {
        NonZeroU32::new(minutes)
            .map(Self)
            .ok_or_else(|| StockError::InvalidWindow(minutes.to_string()))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl FromStr for WindowMinutes {
    type Err = StockError;

    /// Parse a query-string window. Anything but a positive base-10 integer is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let minutes = trimmed
            .parse::<u32>()
            .map_err(|_| StockError::InvalidWindow(s.to_string()))?;
        Self::new(minutes).map_err(|_| StockError::InvalidWindow(s.to_string()))
    }
}

impl TryFrom<i64> for WindowMinutes {
    type Error = StockError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| StockError::InvalidWindow(value.to_string()))
            .and_then(Self::new)
    }
}

impl<'de> Deserialize<'de> for WindowMinutes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let minutes = u32::deserialize(deserializer)?;
        WindowMinutes::new(minutes).map_err(serde::de::Error::custom)
    }
}

/// Single price observation produced by the upstream provider.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct PriceSample {
    pub price: f64,
    #[serde(rename = "lastUpdatedAt", alias = "observedAt", alias = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// Chronologically ordered [`PriceSample`]s for one ticker over one window.
///
/// Sample order is significant: covariance pairs the i-th samples of two series.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct PriceSeries {
    pub ticker: Ticker,
    pub window: WindowMinutes,
    pub samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(ticker: Ticker, window: WindowMinutes, samples: Vec<PriceSample>) -> Self {
        Self {
            ticker,
            window,
            samples,
        }
    }

    /// Numeric projection of the series used by the [`statistics`](crate::statistics) engine.
    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|sample| sample.price).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Per-ticker statistics derived from one [`PriceSeries`].
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct TickerStats {
    pub ticker: Ticker,
    pub average: f64,
    /// Sample standard deviation, `None` when the series holds fewer than two samples.
    pub stddev: Option<f64>,
    pub series: PriceSeries,
}

/// Pearson correlation between two tickers plus the statistics of each side.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct CorrelationResult {
    pub ticker_a: Ticker,
    pub ticker_b: Ticker,
    pub coefficient: f64,
    pub stats_a: TickerStats,
    pub stats_b: TickerStats,
}

/// Unordered pair of distinct tickers, stored in the order it was generated.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display, Serialize)]
#[display("{a}/{b}")]
pub struct TickerPair {
    pub a: Ticker,
    pub b: Ticker,
}

impl TickerPair {
    pub fn new(a: Ticker, b: Ticker) -> Self {
        Self { a, b }
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        &self.a == ticker || &self.b == ticker
    }

    /// Determine if this pair joins `x` and `y`, in either order.
    pub fn matches(&self, x: &Ticker, y: &Ticker) -> bool {
        (&self.a == x && &self.b == y) || (&self.a == y && &self.b == x)
    }
}

/// Failure to produce the [`CorrelationResult`] of one pair during a matrix build.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct PairFailure {
    pub pair: TickerPair,
    pub error: StockError,
}

/// Pairwise correlations across a ticker set, one entry per unordered pair.
///
/// Lookups are symmetric, and the diagonal is always `1.0`.
#[derive(Clone, PartialEq, Debug)]
pub struct CorrelationMatrix {
    pub window: WindowMinutes,
    pub tickers: Vec<Ticker>,
    pub results: IndexMap<TickerPair, CorrelationResult>,
    pub failures: Vec<PairFailure>,
}

impl CorrelationMatrix {
    pub fn new(window: WindowMinutes, tickers: Vec<Ticker>) -> Self {
        Self {
            window,
            tickers,
            results: IndexMap::new(),
            failures: Vec::new(),
        }
    }

    /// Total number of unordered pairs the matrix covers.
    pub fn pair_count(&self) -> usize {
        let n = self.tickers.len();
        n * n.saturating_sub(1) / 2
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.results.len() == self.pair_count()
    }

    pub fn get(&self, x: &Ticker, y: &Ticker) -> Option<&CorrelationResult> {
        self.results
            .iter()
            .find_map(|(pair, result)| pair.matches(x, y).then_some(result))
    }

    pub fn failure(&self, x: &Ticker, y: &Ticker) -> Option<&PairFailure> {
        self.failures.iter().find(|failure| failure.pair.matches(x, y))
    }

    /// Correlation coefficient of `x` and `y`. `coefficient(x, y) == coefficient(y, x)`.
    pub fn coefficient(&self, x: &Ticker, y: &Ticker) -> Option<f64> {
        if x == y {
            return self.tickers.contains(x).then_some(1.0);
        }
        self.get(x, y).map(|result| result.coefficient)
    }

    /// Expand the pairs into a full N×N grid ordered like [`Self::tickers`].
    ///
    /// Failed pairs are `None`.
    pub fn grid(&self) -> Vec<Vec<Option<f64>>> {
        self.tickers
            .iter()
            .map(|row| {
                self.tickers
                    .iter()
                    .map(|column| self.coefficient(row, column))
                    .collect()
            })
            .collect()
    }
}
