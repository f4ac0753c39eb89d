//! BTreeMap-based normalized book state
//!
//! Each side is keyed by numeric price, so iteration order is price order and
//! never lexicographic. Bids are read back-to-front to get best-first order.

use obsync_types::{Amount, PriceLevel, Side};
use std::collections::BTreeMap;

/// One side of the book: price → level, zero-quantity levels never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Amount, PriceLevel>,
}

impl SideBook {
    /// Create an empty side
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Build a side from raw levels; later duplicates overwrite earlier ones
    pub fn from_levels<I>(side: Side, levels: I) -> Self
    where
        I: IntoIterator<Item = PriceLevel>,
    {
        let mut book = Self::new(side);
        for level in levels {
            book.upsert(level);
        }
        book
    }

    /// Which side this is
    pub fn side(&self) -> Side {
        self.side
    }

    /// Insert or overwrite a level. A zero quantity removes the price instead.
    pub fn upsert(&mut self, level: PriceLevel) {
        if level.is_zero() {
            self.levels.remove(&level.price);
        } else {
            self.levels.insert(level.price.clone(), level);
        }
    }

    /// Remove a price; removing an absent price is a no-op
    pub fn remove(&mut self, price: &Amount) -> Option<PriceLevel> {
        self.levels.remove(price)
    }

    /// Level at an exact price
    pub fn get(&self, price: &Amount) -> Option<&PriceLevel> {
        self.levels.get(price)
    }

    /// True if a price is present
    pub fn contains(&self, price: &Amount) -> bool {
        self.levels.contains_key(price)
    }

    /// Best level (highest bid / lowest ask)
    pub fn best(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Bids => self.levels.values().next_back(),
            Side::Asks => self.levels.values().next(),
        }
    }

    /// Levels best-first, at most `n`
    pub fn top(&self, n: usize) -> Vec<PriceLevel> {
        match self.side {
            Side::Bids => self.levels.values().rev().take(n).cloned().collect(),
            Side::Asks => self.levels.values().take(n).cloned().collect(),
        }
    }

    /// All levels best-first
    pub fn sorted(&self) -> Vec<PriceLevel> {
        self.top(self.levels.len())
    }

    /// Number of price levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True if no level rests on this side
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Normalized book for one subscribed market
///
/// Created fresh from every accepted snapshot and replaced wholesale by the
/// next one. Deltas produce a new value; the previous value stays valid for
/// anyone still holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBookState {
    /// Market id from the message envelope
    pub market_id: String,
    /// Bid side
    pub bids: SideBook,
    /// Ask side
    pub asks: SideBook,
    /// Integer microseconds of the last applied message
    pub timestamp: String,
    /// Server-reported level count of the last applied message
    pub level_count: u64,
}

impl NormalizedBookState {
    /// Empty book for a market
    pub fn empty(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            bids: SideBook::new(Side::Bids),
            asks: SideBook::new(Side::Asks),
            timestamp: String::new(),
            level_count: 0,
        }
    }

    /// Borrow a side
    pub fn side(&self, side: Side) -> &SideBook {
        match side {
            Side::Bids => &self.bids,
            Side::Asks => &self.asks,
        }
    }

    /// Mutably borrow a side
    pub fn side_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Bids => &mut self.bids,
            Side::Asks => &mut self.asks,
        }
    }

    /// Levels stored across both sides
    pub fn stored_levels(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}
