//! High-level client for the obsync order book feed
//!
//! This crate wires the transport, the sync controller and the market
//! selection together, adds an optional reconnect policy, and provides
//! display helpers for 18-decimal amounts.
//!
//! # Quick Start
//!
//! ```no_run
//! use obsync_sdk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env();
//!     let mut client = OrderBookClientBuilder::from_app_config(&config)
//!         .with_spread(SpreadOption::Tenth)
//!         .connect()
//!         .await?;
//!
//!     let mut views = client.events().unwrap();
//!     while let Some(view) = views.recv().await {
//!         if let Some(bid) = view.top.best_bid() {
//!             println!("best bid {}", format_amount(&bid.price, 2));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Builder**: validated configuration with defaults
//! - **Reconnection**: exponential backoff with jitter after remote closes
//! - **Self-healing book**: checksum mismatch and market switch resubscribe
//! - **Display**: thousands separators and truncated decimals, no floats

pub mod builder;
pub mod client;
pub mod config;
pub mod display;
pub mod prelude;
pub mod reconnect;

// Re-export main types
pub use builder::{ConfigError, OrderBookClientBuilder};
pub use client::{ClientError, OrderBookClient, ViewReceiver};
pub use config::AppConfig;
pub use reconnect::ReconnectConfig;

// Re-export commonly used types from dependencies
pub use obsync_book::{BookRow, TopLevels};
pub use obsync_types::{Amount, PriceLevel, SpreadOption, SyncError};
pub use obsync_ws::{BookView, SyncStats, TransportState};
