//! Market catalog client implementation

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use obsync_types::MarketsResponse;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default API base URL for a local feed
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// Default request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Source of the static market catalog
#[async_trait]
pub trait MarketCatalog: Send + Sync {
    /// Fetch every listed market
    async fn fetch_markets(&self) -> CatalogResult<MarketsResponse>;
}

/// Catalog client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// API base URL, without the `/markets` path
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Custom user agent
    pub user_agent: Option<String>,
    /// Bearer token sent as `Authorization`
    pub bearer_token: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: None,
            bearer_token: None,
        }
    }
}

impl CatalogConfig {
    /// Create a configuration for a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// HTTP market catalog
///
/// # Example
///
/// ```no_run
/// use obsync_rest::{HttpMarketCatalog, MarketCatalog};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = HttpMarketCatalog::new("http://localhost:3001")?;
///     for market in catalog.fetch_markets().await?.markets {
///         println!("{} {}", market.market_id, market.symbol());
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpMarketCatalog {
    http_client: Client,
    config: CatalogConfig,
}

impl HttpMarketCatalog {
    /// Create a catalog client with default timeout
    pub fn new(base_url: impl Into<String>) -> CatalogResult<Self> {
        Self::with_config(CatalogConfig::new(base_url))
    }

    /// Create a catalog client with custom configuration
    pub fn with_config(config: CatalogConfig) -> CatalogResult<Self> {
        let base = config.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(CatalogError::InvalidUrl(config.base_url.clone()));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_deref().unwrap_or("obsync-rest/0.1.0"))
            .build()
            .map_err(|e| CatalogError::Unknown(e.to_string()))?;

        info!("Created market catalog client for {}", config.base_url);

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Full URL of the markets endpoint
    pub fn markets_url(&self) -> String {
        format!("{}/markets", self.config.base_url.trim().trim_end_matches('/'))
    }
}

#[async_trait]
impl MarketCatalog for HttpMarketCatalog {
    #[instrument(skip(self), fields(url = %self.markets_url()))]
    async fn fetch_markets(&self) -> CatalogResult<MarketsResponse> {
        debug!("Fetching market catalog");

        let mut request = self.http_client.get(self.markets_url());
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = CatalogError::from_status(status.as_u16(), &body);
            warn!("Market catalog request failed: {} ({})", err, err.code());
            return Err(err);
        }

        let markets = parse_markets_body(&body)?;
        debug!("Fetched {} markets", markets.markets.len());
        Ok(markets)
    }
}

impl std::fmt::Debug for HttpMarketCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMarketCatalog")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("has_token", &self.config.bearer_token.is_some())
            .finish()
    }
}

/// Fixed catalog, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    response: MarketsResponse,
}

impl StaticCatalog {
    /// Serve this response on every fetch
    pub fn new(response: MarketsResponse) -> Self {
        Self { response }
    }
}

#[async_trait]
impl MarketCatalog for StaticCatalog {
    async fn fetch_markets(&self) -> CatalogResult<MarketsResponse> {
        Ok(self.response.clone())
    }
}

/// Parse a catalog body with the markets array at `markets` or `data.markets`
pub fn parse_markets_body(body: &str) -> CatalogResult<MarketsResponse> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

    let payload = if value.get("markets").is_some_and(Value::is_array) {
        value
    } else {
        match value.get("data") {
            Some(data) if data.get("markets").is_some_and(Value::is_array) => data.clone(),
            _ => {
                return Err(CatalogError::InvalidResponse(
                    "missing markets array".to_string(),
                ))
            }
        }
    };

    serde_json::from_value(payload).map_err(|e| CatalogError::InvalidResponse(e.to_string()))
}
