//! Environment-driven application configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `ORDERBOOK_API_BASE_URL` | `http://localhost:3001` |
//! | `ORDERBOOK_WS_URL` | `ws://localhost:3001/ws` |
//! | `ORDERBOOK_API_TIMEOUT_MS` | `10000` |
//! | `ORDERBOOK_MARKET_IDS` | `1` |

use obsync_rest::{CatalogConfig, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_MS};
use obsync_ws::{DEFAULT_FALLBACK_MARKET_ID, DEFAULT_WS_URL};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "ORDERBOOK_API_BASE_URL";
pub const ENV_WS_URL: &str = "ORDERBOOK_WS_URL";
pub const ENV_API_TIMEOUT_MS: &str = "ORDERBOOK_API_TIMEOUT_MS";
pub const ENV_MARKET_IDS: &str = "ORDERBOOK_MARKET_IDS";

/// Endpoints and markets for an application run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Market catalog base URL
    pub api_base_url: String,
    /// WebSocket feed URL
    pub ws_url: String,
    /// Catalog request timeout
    pub api_timeout: Duration,
    /// Markets offered for selection; the first is selected on start
    pub market_ids: Vec<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            api_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            market_ids: vec![DEFAULT_FALLBACK_MARKET_ID],
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_base_url: non_empty(ENV_API_BASE_URL).unwrap_or(defaults.api_base_url),
            ws_url: non_empty(ENV_WS_URL).unwrap_or(defaults.ws_url),
            api_timeout: Duration::from_millis(parse_number(
                lookup(ENV_API_TIMEOUT_MS).as_deref(),
                DEFAULT_TIMEOUT_MS,
            )),
            market_ids: parse_number_list(lookup(ENV_MARKET_IDS).as_deref(), &defaults.market_ids),
        }
    }

    /// Market selected on start
    pub fn initial_market_id(&self) -> u64 {
        self.market_ids
            .first()
            .copied()
            .unwrap_or(DEFAULT_FALLBACK_MARKET_ID)
    }

    /// Catalog client configuration
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::new(self.api_base_url.clone()).with_timeout(self.api_timeout)
    }
}

/// Parse a non-negative number, falling back when missing or unusable
///
/// Fractional values are truncated.
pub fn parse_number(value: Option<&str>, fallback: u64) -> u64 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= u64::MAX as f64)
        .map(|n| n as u64)
        .unwrap_or(fallback)
}

/// Parse a comma separated list of positive integers
///
/// Items that are not positive integers are dropped. An empty result falls
/// back.
pub fn parse_number_list(value: Option<&str>, fallback: &[u64]) -> Vec<u64> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return fallback.to_vec();
    };

    let parsed: Vec<u64> = value
        .split(',')
        .filter_map(|item| item.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite() && n.fract() == 0.0 && *n > 0.0 && *n <= u64::MAX as f64)
        .map(|n| n as u64)
        .collect();

    if parsed.is_empty() {
        fallback.to_vec()
    } else {
        parsed
    }
}
