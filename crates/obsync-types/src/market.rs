//! Market catalog types
//!
//! The sync engine only needs a market's id. Everything else here is used to
//! map that id to display symbols and decimals.

use serde::{Deserialize, Serialize};

/// Static market configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Display name, e.g. "BTC"
    pub name: String,
    /// Quote asset, e.g. "USDC"
    pub quote: String,
    /// Quantity step in raw units (a power of ten for most markets)
    pub step_size: String,
    /// Price step in raw units
    pub step_price: String,
    pub maintenance_margin_factor: String,
    pub max_leverage: String,
    pub min_order_size: String,
    pub unlocked: bool,
    pub open_interest_limit: String,
}

/// A market in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Market id as used on the WebSocket envelope
    pub market_id: String,
    /// Market configuration
    pub config: MarketConfig,
}

impl Market {
    /// "BASE/QUOTE" display symbol
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.config.name, self.config.quote)
    }

    /// Numeric id for subscribe requests, if the id is a positive integer
    pub fn numeric_id(&self) -> Option<u64> {
        self.market_id.parse().ok().filter(|id| *id > 0)
    }
}

/// Market catalog response with optional 24h statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketsResponse {
    pub markets: Vec<Market>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_asset_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_asset_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_volume_24h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_funding_rate: Option<String>,
}

impl MarketsResponse {
    /// Look up a market by id
    pub fn find(&self, market_id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.market_id == market_id)
    }

    /// First market with a usable numeric id
    pub fn first_numeric_id(&self) -> Option<u64> {
        self.markets.iter().find_map(Market::numeric_id)
    }
}
