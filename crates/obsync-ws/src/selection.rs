//! Selected-market cell with change notification

use crate::listeners::{ListenerHandle, ListenerSet};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// The market the user is looking at
///
/// A single mutable cell shared between whoever picks the market (a UI, a
/// CLI flag) and the sync controller. Setting a different value notifies
/// listeners synchronously; setting the same value is a no-op.
#[derive(Clone, Debug, Default)]
pub struct MarketSelection {
    current: Arc<RwLock<String>>,
    listeners: Arc<ListenerSet<String>>,
}

impl MarketSelection {
    /// Create a selection holding `market_id`
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(market_id.into())),
            listeners: Arc::new(ListenerSet::new()),
        }
    }

    /// Current selection
    pub fn get(&self) -> String {
        self.current.read().clone()
    }

    /// Change the selection. Returns true if the value changed.
    pub fn set(&self, market_id: impl Into<String>) -> bool {
        let market_id = market_id.into();
        {
            let mut current = self.current.write();
            if *current == market_id {
                return false;
            }
            debug!("Market selection {} -> {}", *current, market_id);
            *current = market_id.clone();
        }
        self.listeners.emit(&market_id);
        true
    }

    /// Listen for changes; the listener receives the new market id
    pub fn on_change<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        ListenerSet::subscribe(&self.listeners, listener)
    }
}
