//! Spread aggregation
//!
//! Levels are grouped into price buckets of a fixed power-of-ten width. The
//! bucket of a price is `(price / scale) * scale` using integer division, so
//! buckets always round towards zero regardless of side.

use obsync_types::{Amount, PriceLevel, Side};
use std::collections::BTreeMap;

/// Bucket `levels` by `scale`, sort best-first for `side` and keep `depth` buckets
///
/// Quantities and order counts of levels sharing a bucket are summed. A
/// bucket keeps the origin block/log index of the first level seen in input
/// order. A scale of one returns the input unchanged apart from truncation.
pub fn aggregate_levels(
    levels: &[PriceLevel],
    side: Side,
    scale: &Amount,
    depth: usize,
) -> Vec<PriceLevel> {
    if scale.is_one() || scale.is_zero() {
        return levels.iter().take(depth).cloned().collect();
    }

    let mut buckets: BTreeMap<Amount, PriceLevel> = BTreeMap::new();
    for level in levels {
        let price = level.price.bucket(scale);
        match buckets.get_mut(&price) {
            Some(bucket) => {
                bucket.quantity += &level.quantity;
                bucket.order_count += level.order_count;
            }
            None => {
                let bucket = PriceLevel {
                    price: price.clone(),
                    ..level.clone()
                };
                buckets.insert(price, bucket);
            }
        }
    }

    match side {
        Side::Bids => buckets.into_values().rev().take(depth).collect(),
        Side::Asks => buckets.into_values().take(depth).collect(),
    }
}
