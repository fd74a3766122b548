use std::net::SocketAddr;
use stock_insight::{StockError, Ticker};

pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HEATMAP_TICKERS: &str = "HEATMAP_TICKERS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
/// Tickers correlated by the matrix route when the request names none.
pub const DEFAULT_HEATMAP_TICKERS: [&str; 5] = ["NVDA", "PYPL", "AAPL", "MSFT", "GOOGL"];

/// Log output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(ENV_LOG_FORMAT) {
            Some(format) if format.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// HTTP server configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Default ticker set of `GET /stockcorrelation/matrix`.
    pub heatmap_tickers: Vec<Ticker>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, StockError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StockError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind = env_str(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let port = match env_str(ENV_PORT) {
            None => DEFAULT_PORT,
            Some(raw) => raw
                .parse()
                .map_err(|_| StockError::Config(format!("{ENV_PORT} is invalid: {raw:?}")))?,
        };

        let heatmap_tickers = match env_str(ENV_HEATMAP_TICKERS) {
            None => DEFAULT_HEATMAP_TICKERS
                .iter()
                .map(|symbol| Ticker::new(symbol))
                .collect::<Result<Vec<_>, _>>()?,
            Some(raw) => raw
                .split(',')
                .filter(|symbol| !symbol.trim().is_empty())
                .map(Ticker::new)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| {
                    StockError::Config(format!("{ENV_HEATMAP_TICKERS} is invalid: {error}"))
                })?,
        };

        Ok(Self {
            bind,
            port,
            heatmap_tickers,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, StockError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|error| {
                StockError::Config(format!(
                    "{ENV_BIND_ADDR}:{ENV_PORT} is not a socket address: {error}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| vars.get(name).cloned()
    }

    fn tickers(symbols: &[&str]) -> Vec<Ticker> {
        symbols.iter().map(|s| Ticker::new(s).unwrap()).collect()
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind, DEFAULT_BIND_ADDR);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.heatmap_tickers, tickers(&DEFAULT_HEATMAP_TICKERS));
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:3001".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_server_config_from_lookup() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
            expected: Result<(u16, Vec<&'static str>), ()>,
        }

        let tests = vec![
            TestCase {
                // TC0: custom port & heatmap set, blanks skipped
                vars: vec![(ENV_PORT, "8080"), (ENV_HEATMAP_TICKERS, "AAPL, MSFT,,TSLA ")],
                expected: Ok((8080, vec!["AAPL", "MSFT", "TSLA"])),
            },
            TestCase {
                // TC1: non-numeric port
                vars: vec![(ENV_PORT, "http")],
                expected: Err(()),
            },
            TestCase {
                // TC2: port out of range
                vars: vec![(ENV_PORT, "70000")],
                expected: Err(()),
            },
            TestCase {
                // TC3: invalid ticker in heatmap set
                vars: vec![(ENV_HEATMAP_TICKERS, "AAPL,../etc")],
                expected: Err(()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = ServerConfig::from_lookup(lookup(&test.vars));
            match (actual, test.expected) {
                (Ok(actual), Ok((port, symbols))) => {
                    assert_eq!(actual.port, port, "TC{} failed", index);
                    assert_eq!(actual.heatmap_tickers, tickers(&symbols), "TC{} failed", index);
                }
                (Err(StockError::Config(_)), Err(())) => {}
                (actual, expected) => {
                    panic!(
                        "TC{index} failed because actual != expected. \nActual: {actual:?}\nExpected: {expected:?}\n"
                    );
                }
            }
        }
    }

    #[test]
    fn test_socket_addr_rejects_invalid_bind() {
        let config =
            ServerConfig::from_lookup(lookup(&[(ENV_BIND_ADDR, "not an address")])).unwrap();
        assert!(matches!(config.socket_addr(), Err(StockError::Config(_))));
    }

    #[test]
    fn test_log_format_from_lookup() {
        assert_eq!(LogFormat::from_lookup(lookup(&[])), LogFormat::Pretty);
        assert_eq!(
            LogFormat::from_lookup(lookup(&[(ENV_LOG_FORMAT, "JSON")])),
            LogFormat::Json
        );
        assert_eq!(
            LogFormat::from_lookup(lookup(&[(ENV_LOG_FORMAT, "text")])),
            LogFormat::Pretty
        );
    }
}
