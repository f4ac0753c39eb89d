//! Stream and sync configuration

use obsync_book::{CHECKSUM_DEPTH, DEFAULT_DISPLAY_DEPTH};
use obsync_types::SpreadOption;
use std::time::Duration;

/// Default WebSocket endpoint for a local feed
pub const DEFAULT_WS_URL: &str = "ws://localhost:3001/ws";

/// Market subscribed to when the selection does not hold a usable id
pub const DEFAULT_FALLBACK_MARKET_ID: u64 = 1;

/// Configuration for the stream transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// WebSocket URL
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl StreamConfig {
    /// Create a config for a URL with default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Configuration for the sync controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Market used when the selection is not a positive integer
    pub fallback_market_id: u64,
    /// Levels per side in the display view
    pub display_depth: usize,
    /// Levels per side covered by checksum verification
    pub checksum_depth: usize,
    /// Display aggregation
    pub spread: SpreadOption,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fallback_market_id: DEFAULT_FALLBACK_MARKET_ID,
            display_depth: DEFAULT_DISPLAY_DEPTH,
            checksum_depth: CHECKSUM_DEPTH,
            spread: SpreadOption::Raw,
        }
    }
}

impl SyncConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback market
    pub fn with_fallback_market(mut self, market_id: u64) -> Self {
        self.fallback_market_id = market_id;
        self
    }

    /// Set display depth
    pub fn with_display_depth(mut self, depth: usize) -> Self {
        self.display_depth = depth;
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

    /// Resolve the market to subscribe to from a selection value
    ///
    /// Anything that is not a positive integer resolves to the fallback.
    pub fn resolve_market_id(&self, selected: &str) -> u64 {
        selected
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .unwrap_or(self.fallback_market_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config() {
        let config = StreamConfig::new("wss://feed.test/ws").with_timeout(Duration::from_secs(5));
        assert_eq!(config.url, "wss://feed.test/ws");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(StreamConfig::default().url, DEFAULT_WS_URL);
    }

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.display_depth, 20);
        assert_eq!(config.checksum_depth, 10);
        assert_eq!(config.fallback_market_id, 1);
        assert_eq!(config.spread, SpreadOption::Raw);
    }

    #[test]
    fn test_resolve_market_id() {
        let config = SyncConfig::new().with_fallback_market(7);
        assert_eq!(config.resolve_market_id("3"), 3);
        assert_eq!(config.resolve_market_id(" 4 "), 4);
        assert_eq!(config.resolve_market_id("0"), 7);
        assert_eq!(config.resolve_market_id("-2"), 7);
        assert_eq!(config.resolve_market_id("1.5"), 7);
        assert_eq!(config.resolve_market_id("btc"), 7);
        assert_eq!(config.resolve_market_id(""), 7);
    }
}
