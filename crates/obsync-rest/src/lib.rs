//! HTTP market catalog client for the obsync order book feed
//!
//! The catalog maps a market id to display symbols and decimals. The sync
//! engine itself only needs the id, so this crate sits beside it rather
//! than under it.
//!
//! # Example
//!
//! ```no_run
//! use obsync_rest::{CatalogConfig, HttpMarketCatalog, MarketCatalog};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CatalogConfig::new("http://localhost:3001")
//!         .with_timeout(Duration::from_secs(5));
//!     let catalog = HttpMarketCatalog::with_config(config)?;
//!
//!     let markets = catalog.fetch_markets().await?;
//!     if let Some(market) = markets.find("1") {
//!         println!("Market 1 is {}", market.symbol());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failures carry a stable [`CatalogError::code`] such as `not_found` or
//! `timeout_error`.

pub mod client;
pub mod error;

// Re-export main types
pub use client::{
    parse_markets_body, CatalogConfig, HttpMarketCatalog, MarketCatalog, StaticCatalog,
    DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_MS,
};
pub use error::{CatalogError, CatalogResult};
