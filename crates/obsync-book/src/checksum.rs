//! CRC32 checksum validation for orderbook integrity
//!
//! # Algorithm
//!
//! 1. Take the first `depth` bids (best first) and the first `depth` asks
//! 2. Interleave by index: bid price, bid quantity, ask price, ask quantity
//! 3. Join every emitted token with `:`; a missing level on the shorter side
//!    is skipped, never padded
//! 4. Apply standard CRC32 (ISO 3309, polynomial 0xEDB88320) to the UTF-8 bytes
//!
//! Prices and quantities are emitted in their canonical integer form, so the
//! string is identical for any two books holding the same levels.

use crc32fast::Hasher;
use obsync_types::{ChecksumValue, PriceLevel};

/// Number of levels per side covered by the checksum
pub const CHECKSUM_DEPTH: usize = 10;

/// Build the canonical `price:qty:price:qty...` string
///
/// # Example
///
/// ```
/// use obsync_book::build_canonical_string;
/// use obsync_types::PriceLevel;
///
/// let bids = [PriceLevel::parse("100", "10").unwrap()];
/// let asks = [PriceLevel::parse("101", "5").unwrap()];
/// assert_eq!(build_canonical_string(&bids, &asks, 10), "100:10:101:5");
/// ```
pub fn build_canonical_string(bids: &[PriceLevel], asks: &[PriceLevel], depth: usize) -> String {
    let rows = depth.min(bids.len().max(asks.len()));
    let mut tokens: Vec<String> = Vec::with_capacity(rows * 4);

    for i in 0..rows {
        if let Some(bid) = bids.get(i) {
            tokens.push(bid.price.to_string());
            tokens.push(bid.quantity.to_string());
        }
        if let Some(ask) = asks.get(i) {
            tokens.push(ask.price.to_string());
            tokens.push(ask.quantity.to_string());
        }
    }

    tokens.join(":")
}

/// CRC32 of the canonical string
pub fn compute_checksum(bids: &[PriceLevel], asks: &[PriceLevel], depth: usize) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(build_canonical_string(bids, asks, depth).as_bytes());
    hasher.finalize()
}

/// True if either side is too shallow for the checksum to be meaningful
fn is_shallow(bids: &[PriceLevel], asks: &[PriceLevel], depth: usize) -> bool {
    bids.len() < depth || asks.len() < depth
}

/// Verify the book against a server checksum
///
/// Always passes while either side holds fewer than `depth` levels. The
/// expected value accepts anything convertible to [`ChecksumValue`]; use
/// [`ChecksumValue::parse_str`] for decimal or `0x` hexadecimal strings.
pub fn verify_checksum(
    bids: &[PriceLevel],
    asks: &[PriceLevel],
    expected: impl Into<ChecksumValue>,
    depth: usize,
) -> bool {
    if is_shallow(bids, asks, depth) {
        return true;
    }
    compute_checksum(bids, asks, depth) == expected.into().get()
}

/// Compare against an optional server checksum
///
/// Returns `None` when there is nothing to compare: no checksum on the
/// message, or a book shallower than `depth` on either side.
pub fn check_checksum(
    bids: &[PriceLevel],
    asks: &[PriceLevel],
    expected: Option<u32>,
    depth: usize,
) -> Option<ChecksumResult> {
    let expected = expected?;
    if is_shallow(bids, asks, depth) {
        return None;
    }
    Some(ChecksumResult::new(compute_checksum(bids, asks, depth), expected))
}

/// Checksum result with computed and expected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumResult {
    /// The computed checksum
    pub computed: u32,
    /// The expected checksum from the server
    pub expected: u32,
}

impl ChecksumResult {
    /// Create a new checksum result
    pub fn new(computed: u32, expected: u32) -> Self {
        Self { computed, expected }
    }

    /// Check if the checksum matches
    pub fn is_valid(&self) -> bool {
        self.computed == self.expected
    }
}
