//! Configuration for the upstream price provider and the orchestrator.
//!
//! Values come from environment variables, read once at process start. Parsing goes
//! through a lookup function so the same code path can be exercised from a map.

use crate::error::StockError;
use std::time::Duration;
use url::Url;

/// Environment variable holding the upstream provider base url.
pub const ENV_API_BASE_URL: &str = "API_BASE_URL";
/// Environment variable holding the bearer token passed through to the provider.
pub const ENV_API_TOKEN: &str = "API_TOKEN";
/// Environment variable holding the per-fetch timeout in milliseconds.
pub const ENV_API_TIMEOUT_MS: &str = "API_TIMEOUT_MS";
/// Environment variable holding the number of extra attempts after a transient failure.
pub const ENV_FETCH_RETRIES: &str = "FETCH_RETRIES";
/// Environment variable holding the delay between attempts in milliseconds.
pub const ENV_FETCH_RETRY_BACKOFF_MS: &str = "FETCH_RETRY_BACKOFF_MS";

/// Default bound on a single upstream fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Default delay between fetch attempts when retries are enabled.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Upstream price provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider base url, eg/ `http://20.244.56.144/evaluation-service`.
    pub base_url: Url,
    /// Bearer token. Empty ⇒ no `Authorization` header is sent.
    pub token: String,
    /// Bound applied to every request sent to the provider.
    pub request_timeout: Duration,
}

impl ProviderConfig {
    /// Create a new configuration with a custom base url and default settings.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: String::new(),
            request_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self, StockError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StockError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(&lookup, ENV_API_BASE_URL)
            .ok_or_else(|| StockError::Config(format!("{ENV_API_BASE_URL} is not set")))?;
        let base_url = Url::parse(&base_url)
            .map_err(|error| StockError::Config(format!("{ENV_API_BASE_URL} is invalid: {error}")))?;

        if base_url.cannot_be_a_base() {
            return Err(StockError::Config(format!(
                "{ENV_API_BASE_URL} cannot be used as a base url: {base_url}"
            )));
        }

        let request_timeout = parse_or(&lookup, ENV_API_TIMEOUT_MS, DEFAULT_FETCH_TIMEOUT.as_millis() as u64)?;

        Ok(Self::new(base_url)
            .with_token(non_empty(&lookup, ENV_API_TOKEN).unwrap_or_default())
            .with_request_timeout(Duration::from_millis(request_timeout)))
    }
}

/// Retry policy applied by the orchestrator to transient upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub const NONE: Self = Self {
        max_attempts: 1,
        backoff: Duration::ZERO,
    };

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// [`CorrelationOrchestrator`](crate::orchestrator::CorrelationOrchestrator) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bound applied to every fetch, independent of the client implementation.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            retry: RetryPolicy::NONE,
        }
    }
}

impl OrchestratorConfig {
    /// Set fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self, StockError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StockError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_ms = parse_or(&lookup, ENV_API_TIMEOUT_MS, DEFAULT_FETCH_TIMEOUT.as_millis() as u64)?;
        let retries = parse_or(&lookup, ENV_FETCH_RETRIES, 0_u32)?;
        let backoff_ms = parse_or(
            &lookup,
            ENV_FETCH_RETRY_BACKOFF_MS,
            DEFAULT_RETRY_BACKOFF.as_millis() as u64,
        )?;

        let retry = match retries {
            0 => RetryPolicy::NONE,
            retries => RetryPolicy::new(
                retries.saturating_add(1),
                Duration::from_millis(backoff_ms),
            ),
        };

        Ok(Self::default()
            .with_fetch_timeout(Duration::from_millis(timeout_ms))
            .with_retry(retry))
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, StockError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match non_empty(lookup, name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| StockError::Config(format!("{name} is invalid: {raw:?}"))),
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

    #[test]
    fn test_provider_config_from_lookup() {
        let config = ProviderConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "http://20.244.56.144/evaluation-service"),
            (ENV_API_TOKEN, " secret "),
            (ENV_API_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();

        assert_eq!(
            config.base_url.as_str(),
            "http://20.244.56.144/evaluation-service"
        );
        assert_eq!(config.token, "secret");
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_provider_config_defaults() {
        let config =
            ProviderConfig::from_lookup(lookup(&[(ENV_API_BASE_URL, "http://localhost:8080")]))
                .unwrap();

        assert_eq!(config.token, "");
        assert_eq!(config.request_timeout, DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_provider_config_rejects_invalid() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
        }

        let tests = vec![
            TestCase {
                // TC0: missing base url
                vars: vec![],
            },
            TestCase {
                // TC1: blank base url
                vars: vec![(ENV_API_BASE_URL, "   ")],
            },
            TestCase {
                // TC2: unparsable base url
                vars: vec![(ENV_API_BASE_URL, "not a url")],
            },
            TestCase {
                // TC3: base url that cannot hold path segments
                vars: vec![(ENV_API_BASE_URL, "mailto:ops@example.com")],
            },
            TestCase {
                // TC4: non-numeric timeout
                vars: vec![
                    (ENV_API_BASE_URL, "http://localhost:8080"),
                    (ENV_API_TIMEOUT_MS, "soon"),
                ],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = ProviderConfig::from_lookup(lookup(&test.vars));
            assert!(
                matches!(actual, Err(StockError::Config(_))),
                "TC{} failed: {:?}",
                index,
                actual
            );
        }
    }

    #[test]
    fn test_orchestrator_config_from_lookup() {
        let config = OrchestratorConfig::from_lookup(lookup(&[
            (ENV_API_TIMEOUT_MS, "800"),
            (ENV_FETCH_RETRIES, "2"),
            (ENV_FETCH_RETRY_BACKOFF_MS, "50"),
        ]))
        .unwrap();

        assert_eq!(config.fetch_timeout, Duration::from_millis(800));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Duration::from_millis(50));

        let config = OrchestratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_retry_policy_always_attempts_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::NONE);
    }
}
