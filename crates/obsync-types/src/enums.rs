//! Channel, Side, MessageKind and SpreadOption enums

use crate::amount::{Amount, BASE_UNDERLYING_DECIMALS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WebSocket channel types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Level 2 orderbook channel
    Orderbook,
}

impl Channel {
    /// Returns the channel name as used in API messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orderbook => "orderbook",
        }
    }
}

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Resting buy interest, best price is the highest
    Bids,
    /// Resting sell interest, best price is the lowest
    Asks,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bids => Self::Asks,
            Self::Asks => Self::Bids,
        }
    }

    /// Returns true if `a` sorts strictly ahead of `b` on this side
    pub fn is_better(&self, a: &Amount, b: &Amount) -> bool {
        match self {
            Self::Bids => a > b,
            Self::Asks => a < b,
        }
    }
}

/// Kind of the last accepted book message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    /// Nothing accepted yet for the selected market
    #[default]
    None,
    /// Full book replacement
    Snapshot,
    /// Incremental patch
    Update,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Snapshot => "snapshot",
            Self::Update => "update",
        };
        f.write_str(s)
    }
}

/// Price aggregation granularity for the display view
///
/// Keyed by exact strings, never by float proximity. Prices carry 18 implied
/// decimals, so `0.01` buckets by `10^16` raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpreadOption {
    /// No aggregation: every raw price is its own bucket
    #[default]
    #[serde(rename = "raw")]
    Raw,
    /// 0.01 quote units
    #[serde(rename = "0.01")]
    Hundredth,
    /// 0.1 quote units
    #[serde(rename = "0.1")]
    Tenth,
    /// 1 quote unit
    #[serde(rename = "1")]
    One,
}

impl SpreadOption {
    /// All supported options, finest first
    pub const ALL: [SpreadOption; 4] = [Self::Raw, Self::Hundredth, Self::Tenth, Self::One];

    /// The option key as shown to users and accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Hundredth => "0.01",
            Self::Tenth => "0.1",
            Self::One => "1",
        }
    }

    /// Power of ten applied to raw prices
    pub fn exponent(&self) -> u32 {
        match self {
            Self::Raw => 0,
            Self::Hundredth => BASE_UNDERLYING_DECIMALS - 2,
            Self::Tenth => BASE_UNDERLYING_DECIMALS - 1,
            Self::One => BASE_UNDERLYING_DECIMALS,
        }
    }

    /// Bucket scale in raw price units
    pub fn scale(&self) -> Amount {
        Amount::pow10(self.exponent())
    }
}

impl fmt::Display for SpreadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised spread key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported spread option {0:?} (supported: raw, 0.01, 0.1, 1)")]
pub struct UnknownSpread(pub String);

impl FromStr for SpreadOption {
    type Err = UnknownSpread;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| UnknownSpread(s.to_string()))
    }
}
