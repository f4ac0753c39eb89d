//! Re-exports for convenience
//!
//! Import everything you need with:
//! ```
//! use obsync_sdk::prelude::*;
//! ```

// Client
pub use crate::builder::{ConfigError, OrderBookClientBuilder};
pub use crate::client::{ClientError, OrderBookClient, ViewReceiver};
pub use crate::config::AppConfig;
pub use crate::reconnect::ReconnectConfig;

// Display helpers
pub use crate::display::{
    display_decimals_from_step_size, format_amount, format_coin_amount, format_integer_string,
    format_timestamp, MarketDisplay,
};

// Types from obsync-types
pub use obsync_types::{
    Amount, BookMessage, Market, MarketsResponse, MessageKind, PriceLevel, Side, SpreadOption,
    SyncError,
};

// Engine types
pub use obsync_book::{to_rows, BookRow, ChecksumResult, NormalizedBookState, TopLevels};

// Stream types
pub use obsync_ws::{
    BookView, CloseEvent, DisconnectReason, ListenerHandle, MarketSelection, StreamTransport,
    SubscriptionState, SyncController, SyncStats, TransportState,
};

// Catalog
pub use obsync_rest::{CatalogError, HttpMarketCatalog, MarketCatalog};
