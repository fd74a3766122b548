use crate::model::Ticker;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `stock-insight`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum StockError {
    #[error("invalid window: {0:?} is not a positive number of minutes")]
    InvalidWindow(String),

    #[error("invalid ticker: {0:?}")]
    InvalidTicker(String),

    #[error("cannot compute statistics over an empty series")]
    EmptyInput,

    #[error("insufficient data: {required} samples required, {actual} provided")]
    InsufficientData { required: usize, actual: usize },

    #[error("series length mismatch: {left} != {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error(
        "\
        price histories are not aligned: {ticker_a} has {len_a} samples, \
        {ticker_b} has {len_b} samples\
    "
    )]
    TickerMismatch {
        ticker_a: Ticker,
        len_a: usize,
        ticker_b: Ticker,
        len_b: usize,
    },

    #[error("correlation is undefined for a constant price series")]
    UndefinedCorrelation,

    #[error("failed to fetch price history for {ticker}: {cause}")]
    UpstreamFetch { ticker: Ticker, cause: FetchCause },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Reason an upstream price-history fetch failed.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum FetchCause {
    #[error("timeout")]
    Timeout,

    #[error("upstream responded with HTTP {0}")]
    Status(u16),

    #[error("transport: {0}")]
    Transport(String),

    #[error("malformed body: {0}")]
    Decode(String),
}

impl StockError {
    /// Construct a [`StockError::UpstreamFetch`] for the provided ticker.
    pub fn upstream(ticker: &Ticker, cause: FetchCause) -> Self {
        Self::UpstreamFetch {
            ticker: ticker.clone(),
            cause,
        }
    }

    /// Determine if the error was caused by invalid caller input rather than by a
    /// dependency or the data it returned.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_validation(&self) -> bool {
        match self {
            StockError::InvalidWindow(_) | StockError::InvalidTicker(_) => true,
            _ => false,
        }
    }

    /// Determine if retrying the operation could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StockError::UpstreamFetch { cause, .. } => match cause {
                FetchCause::Timeout | FetchCause::Transport(_) => true,
                // 4xx replies will not change on retry, 5xx replies might
                FetchCause::Status(code) => *code >= 500 || *code == 429,
                FetchCause::Decode(_) => false,
            },
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchCause {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = value.status() {
            FetchCause::Status(status.as_u16())
        } else if value.is_decode() {
            FetchCause::Decode(value.to_string())
        } else {
            FetchCause::Transport(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::new(symbol).unwrap()
    }

    #[test]
    fn test_stock_error_is_validation() {
        struct TestCase {
            input: StockError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: bad window is a validation error
                input: StockError::InvalidWindow("abc".to_string()),
                expected: true,
            },
            TestCase {
                // TC1: bad ticker is a validation error
                input: StockError::InvalidTicker("".to_string()),
                expected: true,
            },
            TestCase {
                // TC2: upstream failure is a dependency error
                input: StockError::upstream(&ticker("NVDA"), FetchCause::Timeout),
                expected: false,
            },
            TestCase {
                // TC3: undefined correlation is a computation error
                input: StockError::UndefinedCorrelation,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_validation();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_stock_error_is_transient() {
        struct TestCase {
            input: StockError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: timeout may succeed on retry
                input: StockError::upstream(&ticker("AAPL"), FetchCause::Timeout),
                expected: true,
            },
            TestCase {
                // TC1: 503 may succeed on retry
                input: StockError::upstream(&ticker("AAPL"), FetchCause::Status(503)),
                expected: true,
            },
            TestCase {
                // TC2: 404 will not succeed on retry
                input: StockError::upstream(&ticker("AAPL"), FetchCause::Status(404)),
                expected: false,
            },
            TestCase {
                // TC3: malformed body will not succeed on retry
                input: StockError::upstream(
                    &ticker("AAPL"),
                    FetchCause::Decode("expected array".to_string()),
                ),
                expected: false,
            },
            TestCase {
                // TC4: validation errors are never retried
                input: StockError::InvalidWindow("0".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_transient();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_ticker_mismatch_message_names_both_tickers() {
        let error = StockError::TickerMismatch {
            ticker_a: ticker("NVDA"),
            len_a: 3,
            ticker_b: ticker("MSFT"),
            len_b: 2,
        };

        assert_eq!(
            error.to_string(),
            "price histories are not aligned: NVDA has 3 samples, MSFT has 2 samples"
        );
    }
}
