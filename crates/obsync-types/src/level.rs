//! Price level types with arbitrary precision

use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// A price level exactly as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLevel {
    /// Fixed-point price
    pub price: Amount,
    /// Fixed-point resting quantity (all zeros means "remove")
    pub quantity: Amount,
    /// Number of resting orders at this price
    #[serde(default)]
    pub order_count: u64,
    /// Block in which this level last changed
    #[serde(default)]
    pub block_number: u64,
    /// Log index within that block
    #[serde(default)]
    pub log_index: u64,
}

/// A single price level in the normalized book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price of this level
    pub price: Amount,
    /// Quantity at this price level
    pub quantity: Amount,
    /// Number of resting orders
    pub order_count: u64,
    /// Block the level originates from
    pub origin_block: u64,
    /// Log index the level originates from
    pub origin_log_index: u64,
}

impl PriceLevel {
    /// Create a level with no order-count or origin information
    pub fn new(price: Amount, quantity: Amount) -> Self {
        Self {
            price,
            quantity,
            order_count: 0,
            origin_block: 0,
            origin_log_index: 0,
        }
    }

    /// Parse a level from decimal strings (for tests and fixtures)
    pub fn parse(price: &str, quantity: &str) -> Result<Self, crate::AmountError> {
        Ok(Self::new(price.parse()?, quantity.parse()?))
    }

    /// Builder-style order count
    pub fn with_order_count(mut self, order_count: u64) -> Self {
        self.order_count = order_count;
        self
    }

    /// Builder-style origin
    pub fn with_origin(mut self, block: u64, log_index: u64) -> Self {
        self.origin_block = block;
        self.origin_log_index = log_index;
        self
    }

    /// Check if this level has zero quantity (should be removed)
    pub fn is_zero(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl From<RawLevel> for PriceLevel {
    fn from(raw: RawLevel) -> Self {
        Self {
            price: raw.price,
            quantity: raw.quantity,
            order_count: raw.order_count,
            origin_block: raw.block_number,
            origin_log_index: raw.log_index,
        }
    }
}

impl From<&RawLevel> for PriceLevel {
    fn from(raw: &RawLevel) -> Self {
        raw.clone().into()
    }
}
