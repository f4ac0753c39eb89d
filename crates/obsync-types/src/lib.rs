//! Shared types for the obsync order book feed
//!
//! This crate provides the core type definitions used across the obsync workspace.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`Amount`] - Arbitrary-precision fixed-point integer carried as a decimal string
//! - [`PriceLevel`], [`RawLevel`] - Orderbook price levels
//! - [`Side`], [`MessageKind`], [`SpreadOption`] - Enums used by the engine
//! - [`WsMessage`], [`BookMessage`] - Parsed WebSocket messages
//! - [`SubscribeRequest`], [`MarketFilter`] - Outbound subscription requests
//! - [`SyncError`] - Error taxonomy
//! - [`Market`], [`MarketsResponse`] - Market catalog DTOs

pub mod amount;
pub mod enums;
pub mod error;
pub mod level;
pub mod market;
pub mod messages;

// Re-export commonly used types
pub use amount::*;
pub use enums::*;
pub use error::*;
pub use level::*;
pub use market::*;
pub use messages::*;

// Re-export the big integer type for users
pub use num_bigint::BigUint;
