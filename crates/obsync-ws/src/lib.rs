//! WebSocket stream and order book sync controller for the obsync feed
//!
//! This crate connects the pure engine in `obsync-book` to a live feed.
//!
//! # Features
//!
//! - Transport trait with a tokio-tungstenite implementation and a mock
//! - Outbound queue flushed in order on every open
//! - Listener registration with explicit unsubscribe handles
//! - Resubscribe on checksum mismatch and on market switch
//!
//! Reconnecting after a remote close is left to the caller; see the
//! `obsync-sdk` client for a backoff policy built on the close listener.
//!
//! # Example
//!
//! ```no_run
//! use obsync_ws::{MarketSelection, StreamConfig, StreamTransport, SyncConfig, SyncController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = StreamTransport::new(StreamConfig::new("ws://localhost:3001/ws"));
//!     let selection = MarketSelection::new("1");
//!     let controller = SyncController::new(transport, selection.clone(), SyncConfig::default());
//!
//!     let _handle = controller.subscribe(|view| {
//!         if let (Some(bid), Some(ask)) = (view.top.best_bid(), view.top.best_ask()) {
//!             println!("{} / {}", bid.price, ask.price);
//!         }
//!     });
//!
//!     controller.start()?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     selection.set("2");
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     controller.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod events;
pub mod listeners;
pub mod selection;
pub mod stream;
pub mod transport;

// Re-export main types
pub use config::{StreamConfig, SyncConfig, DEFAULT_FALLBACK_MARKET_ID, DEFAULT_WS_URL};
pub use controller::{
    BookView, SubscriptionState, SyncController, SyncStats, STOP_CODE, STOP_REASON,
};
pub use events::{CloseEvent, CloseFrame, DisconnectReason, TransportState};
pub use listeners::{ListenerHandle, ListenerSet};
pub use selection::MarketSelection;
pub use stream::{StreamTransport, TransportFactory};
pub use transport::{Transport, TransportError, WsTransport};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::{MockServer, MockTransport};
