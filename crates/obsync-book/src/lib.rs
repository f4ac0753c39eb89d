//! Order book engine for the obsync feed
//!
//! This crate provides the normalized book state, the snapshot/delta
//! application rules, the top-of-book and spread-aggregation views and the
//! CRC-32 checksum codec. Every operation is a pure function over immutable
//! inputs: applying a delta returns a new state and never touches the old one.
//!
//! # Constraints
//!
//! - NO `tokio` and NO networking code
//! - NO floating point: prices and quantities are arbitrary-precision integers
//!
//! # Example
//!
//! ```
//! use obsync_book::{apply_delta, derive_top_levels, normalize_snapshot};
//! use obsync_types::{RawLevel, SnapshotMessage, SpreadOption, UpdateMessage};
//!
//! let level = |price: &str, quantity: &str| RawLevel {
//!     price: price.parse().unwrap(),
//!     quantity: quantity.parse().unwrap(),
//!     order_count: 1,
//!     block_number: 1,
//!     log_index: 0,
//! };
//!
//! let snapshot = SnapshotMessage::new("1", vec![level("100", "10")], vec![level("101", "5")]);
//! let book = normalize_snapshot(&snapshot);
//!
//! let update = UpdateMessage::new("1", Some(vec![level("100", "0")]), None);
//! let next = apply_delta(&book, &update);
//!
//! assert_eq!(book.bids.len(), 1);
//! assert!(next.bids.is_empty());
//!
//! let top = derive_top_levels(&next, 20, SpreadOption::Raw);
//! assert_eq!(top.asks[0].price.to_string(), "101");
//! ```

pub mod aggregate;
pub mod checksum;
pub mod engine;
pub mod state;
pub mod view;

// Re-export main types
pub use aggregate::aggregate_levels;
pub use checksum::{
    build_canonical_string, check_checksum, compute_checksum, verify_checksum, ChecksumResult,
    CHECKSUM_DEPTH,
};
pub use engine::{
    apply_delta, derive_top_levels, sorted_levels, to_display_snapshot, normalize_snapshot,
    DisplaySnapshot, TopLevels, DEFAULT_DISPLAY_DEPTH, UNLIMITED_DEPTH,
};
pub use state::{NormalizedBookState, SideBook};
pub use view::{notional_quote, to_rows, BookRow};
