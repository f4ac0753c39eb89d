//! Client Builder Pattern
//!
//! Fluent configuration for [`OrderBookClient`](crate::OrderBookClient)
//! with defaults and validation.
//!
//! # Example
//!
//! ```
//! use obsync_sdk::builder::OrderBookClientBuilder;
//! use obsync_types::SpreadOption;
//!
//! let builder = OrderBookClientBuilder::new("wss://feed.example/ws")
//!     .with_market("2")
//!     .with_depth(15)
//!     .with_spread(SpreadOption::Tenth);
//! assert!(builder.validate().is_ok());
//! ```

use crate::config::AppConfig;
use crate::reconnect::ReconnectConfig;
use obsync_book::{CHECKSUM_DEPTH, DEFAULT_DISPLAY_DEPTH};
use obsync_types::SpreadOption;
use obsync_ws::{StreamConfig, SyncConfig, DEFAULT_FALLBACK_MARKET_ID, DEFAULT_WS_URL};
use std::time::Duration;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No URL given
    #[error("WebSocket URL must not be empty")]
    EmptyUrl,

    /// URL is not a WebSocket URL
    #[error("invalid WebSocket URL: {url} (expected ws:// or wss://)")]
    InvalidUrl { url: String },

    /// Display depth of zero
    #[error("display depth must be at least 1")]
    InvalidDepth,

    /// Checksum depth of zero
    #[error("checksum depth must be at least 1")]
    InvalidChecksumDepth,

    /// Fallback market is not a positive id
    #[error("fallback market id must be positive")]
    InvalidFallbackMarket,

    /// Timeout too short
    #[error("connection timeout must be at least 1 second")]
    TimeoutTooShort,
}

/// Builder for an order book client
#[derive(Debug, Clone)]
pub struct OrderBookClientBuilder {
    /// WebSocket URL
    pub url: String,

    /// Market selected on connect
    pub market_id: String,

    /// Market used when the selection is unusable
    pub fallback_market_id: u64,

    /// Display depth per side
    pub depth: usize,

    /// Checksum depth per side
    pub checksum_depth: usize,

    /// Display aggregation
    pub spread: SpreadOption,

    /// Reconnect after remote closes
    pub reconnect: bool,

    /// Reconnect backoff
    pub reconnect_config: ReconnectConfig,

    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for OrderBookClientBuilder {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            market_id: DEFAULT_FALLBACK_MARKET_ID.to_string(),
            fallback_market_id: DEFAULT_FALLBACK_MARKET_ID,
            depth: DEFAULT_DISPLAY_DEPTH,
            checksum_depth: CHECKSUM_DEPTH,
            spread: SpreadOption::Raw,
            reconnect: true,
            reconnect_config: ReconnectConfig::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl OrderBookClientBuilder {
    /// Create a builder for a feed URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a builder from environment configuration
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.ws_url.clone()).with_market(config.initial_market_id().to_string())
    }

    /// Select a market on connect
    pub fn with_market(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = market_id.into();
        self
    }

    /// Set the fallback market
    pub fn with_fallback_market(mut self, market_id: u64) -> Self {
        self.fallback_market_id = market_id;
        self
    }

    /// Set display depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set checksum depth
    pub fn with_checksum_depth(mut self, depth: usize) -> Self {
        self.checksum_depth = depth;
        self
    }

    /// Set display aggregation
    pub fn with_spread(mut self, spread: SpreadOption) -> Self {
        self.spread = spread;
        self
    }

    /// Enable or disable reconnection
    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    /// Disable reconnection
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect = false;
        self
    }

    /// Set the reconnection policy
    pub fn with_reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect_config = config;
        self
    }

    /// Set the connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
            });
        }

        if self.depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }
        if self.checksum_depth == 0 {
            return Err(ConfigError::InvalidChecksumDepth);
        }
        if self.fallback_market_id == 0 {
            return Err(ConfigError::InvalidFallbackMarket);
        }

        if self.connect_timeout < Duration::from_secs(1) {
            return Err(ConfigError::TimeoutTooShort);
        }

        Ok(())
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Transport configuration
    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig::new(self.url.trim()).with_timeout(self.connect_timeout)
    }

    /// Controller configuration
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_fallback_market(self.fallback_market_id)
            .with_display_depth(self.depth)
            .with_checksum_depth(self.checksum_depth)
            .with_spread(self.spread)
    }

    /// Effective reconnection policy
    pub fn effective_reconnect(&self) -> ReconnectConfig {
        if self.reconnect {
            self.reconnect_config.clone()
        } else {
            ReconnectConfig::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fluent_api() {
        let builder = OrderBookClientBuilder::new("wss://feed.test/ws")
            .with_market("4")
            .with_fallback_market(2)
            .with_depth(5)
            .with_checksum_depth(8)
            .with_spread(SpreadOption::One)
            .with_timeout(Duration::from_secs(3));

        assert!(builder.validate().is_ok());

        let sync = builder.to_sync_config();
        assert_eq!(sync.display_depth, 5);
        assert_eq!(sync.checksum_depth, 8);
        assert_eq!(sync.fallback_market_id, 2);
        assert_eq!(sync.spread, SpreadOption::One);

        let stream = builder.to_stream_config();
        assert_eq!(stream.url, "wss://feed.test/ws");
        assert_eq!(stream.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_builder_validation() {
        assert_eq!(
            OrderBookClientBuilder::new("  ").validate(),
            Err(ConfigError::EmptyUrl)
        );
        assert!(matches!(
            OrderBookClientBuilder::new("http://feed.test").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert_eq!(
            OrderBookClientBuilder::default().with_depth(0).validate(),
            Err(ConfigError::InvalidDepth)
        );
        assert_eq!(
            OrderBookClientBuilder::default().with_checksum_depth(0).validate(),
            Err(ConfigError::InvalidChecksumDepth)
        );
        assert_eq!(
            OrderBookClientBuilder::default().with_fallback_market(0).validate(),
            Err(ConfigError::InvalidFallbackMarket)
        );
        assert_eq!(
            OrderBookClientBuilder::default()
                .with_timeout(Duration::from_millis(500))
                .validate(),
            Err(ConfigError::TimeoutTooShort)
        );
    }

    #[test]
    fn test_reconnect_toggle() {
        let builder = OrderBookClientBuilder::default();
        assert!(builder.effective_reconnect().is_enabled());
        assert!(!builder.without_reconnect().effective_reconnect().is_enabled());
    }

    #[test]
    fn test_from_app_config() {
        let config = AppConfig {
            ws_url: "wss://feed.test/ws".to_string(),
            market_ids: vec![7, 8],
            ..Default::default()
        };
        let builder = OrderBookClientBuilder::from_app_config(&config);
        assert_eq!(builder.url, "wss://feed.test/ws");
        assert_eq!(builder.market_id, "7");
    }
}
