//! Snapshot normalization, delta application and derived views
//!
//! All functions here are pure: they read their inputs and return new values.

use crate::aggregate::aggregate_levels;
use crate::state::{NormalizedBookState, SideBook};
use obsync_types::{Amount, PriceLevel, RawLevel, Side, SnapshotMessage, SpreadOption, UpdateMessage};
use serde::Serialize;

/// Default number of levels per side in the display view
pub const DEFAULT_DISPLAY_DEPTH: usize = 20;

/// Depth that never truncates
pub const UNLIMITED_DEPTH: usize = usize::MAX;

/// Sorted, truncated levels for both sides
///
/// Bids are strictly descending and asks strictly ascending by price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopLevels {
    /// Best bid first
    pub bids: Vec<PriceLevel>,
    /// Best ask first
    pub asks: Vec<PriceLevel>,
}

impl TopLevels {
    /// Best bid
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Ask minus bid; `None` if a side is empty or the book is crossed
    pub fn spread(&self) -> Option<Amount> {
        let bid = &self.best_bid()?.price;
        let ask = &self.best_ask()?.price;
        if ask < bid {
            return None;
        }
        Some(ask.saturating_sub(bid))
    }

    /// (ask + bid) / 2, truncated
    pub fn mid_price(&self) -> Option<Amount> {
        let bid = &self.best_bid()?.price;
        let ask = &self.best_ask()?.price;
        Some(&(ask + bid) / &Amount::from(2))
    }

    /// Levels of one side
    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bids => &self.bids,
            Side::Asks => &self.asks,
        }
    }

    /// True if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Full, untruncated sorted view with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySnapshot {
    /// Market id
    pub market_id: String,
    /// All bids, best first
    pub bids: Vec<PriceLevel>,
    /// All asks, best first
    pub asks: Vec<PriceLevel>,
    /// Integer microseconds
    pub timestamp: String,
    /// Server-reported level count
    pub level_count: u64,
}

fn side_from_raw(side: Side, levels: &[RawLevel]) -> SideBook {
    SideBook::from_levels(side, levels.iter().map(PriceLevel::from))
}

fn patch_side(previous: &SideBook, incoming: Option<&[RawLevel]>) -> SideBook {
    let mut next = previous.clone();
    if let Some(levels) = incoming {
        for level in levels {
            next.upsert(PriceLevel::from(level));
        }
    }
    next
}

/// Build a fresh normalized book from a snapshot
///
/// Duplicate prices within one side resolve last-write-wins. Zero-quantity
/// entries are not stored.
pub fn normalize_snapshot(message: &SnapshotMessage) -> NormalizedBookState {
    NormalizedBookState {
        market_id: message.market_id.clone(),
        bids: side_from_raw(Side::Bids, &message.data.bids),
        asks: side_from_raw(Side::Asks, &message.data.asks),
        timestamp: message.timestamp.clone(),
        level_count: message.level_count,
    }
}

/// Apply an update, returning the next state
///
/// For each level of each side present in the update: an all-zero quantity
/// removes the price, anything else inserts or overwrites it. Sides absent
/// from the update are carried over untouched.
pub fn apply_delta(state: &NormalizedBookState, message: &UpdateMessage) -> NormalizedBookState {
    NormalizedBookState {
        market_id: message.market_id.clone(),
        bids: patch_side(&state.bids, message.data.bids.as_deref()),
        asks: patch_side(&state.asks, message.data.asks.as_deref()),
        timestamp: message.timestamp.clone(),
        level_count: message.level_count,
    }
}

/// Best-first levels for both sides, truncated to `depth`, without aggregation
pub fn sorted_levels(state: &NormalizedBookState, depth: usize) -> TopLevels {
    TopLevels {
        bids: state.bids.top(depth),
        asks: state.asks.top(depth),
    }
}

/// Display view: truncate to `depth`, bucket by `spread`, re-truncate
///
/// Truncation happens before aggregation, so buckets only ever combine levels
/// that were already inside the requested window.
pub fn derive_top_levels(
    state: &NormalizedBookState,
    depth: usize,
    spread: SpreadOption,
) -> TopLevels {
    let raw = sorted_levels(state, depth);
    let scale = spread.scale();

    TopLevels {
        bids: aggregate_levels(&raw.bids, Side::Bids, &scale, depth),
        asks: aggregate_levels(&raw.asks, Side::Asks, &scale, depth),
    }
}

/// Full sorted view with metadata, for display headers
pub fn to_display_snapshot(state: &NormalizedBookState) -> DisplaySnapshot {
    DisplaySnapshot {
        market_id: state.market_id.clone(),
        bids: state.bids.sorted(),
        asks: state.asks.sorted(),
        timestamp: state.timestamp.clone(),
        level_count: state.level_count,
    }
}
