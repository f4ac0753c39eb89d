//! Display rows with running totals

use obsync_types::{Amount, PriceLevel, BASE_UNDERLYING_DECIMALS};
use serde::Serialize;

/// A price level plus cumulative depth from the top of its side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRow {
    #[serde(flatten)]
    pub level: PriceLevel,
    /// Sum of quantities from the best level down to this one
    pub cumulative_quantity: Amount,
    /// `price * quantity / 1e18` in raw quote units
    pub notional: Amount,
}

/// Raw notional value of a level: `price * quantity / 10^18`, truncated
pub fn notional_quote(price: &Amount, quantity: &Amount) -> Amount {
    &(price * quantity) / &Amount::pow10(BASE_UNDERLYING_DECIMALS)
}

/// Rows for one side, best first, with running cumulative quantity
pub fn to_rows(levels: &[PriceLevel]) -> Vec<BookRow> {
    let mut cumulative = Amount::zero();
    levels
        .iter()
        .map(|level| {
            cumulative += &level.quantity;
            BookRow {
                level: level.clone(),
                cumulative_quantity: cumulative.clone(),
                notional: notional_quote(&level.price, &level.quantity),
            }
        })
        .collect()
}
