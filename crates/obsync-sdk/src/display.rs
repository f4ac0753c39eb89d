//! Display formatting for raw fixed-point amounts
//!
//! Prices and quantities arrive as 18-decimal integers. These helpers turn
//! them into human-readable strings without ever going through floating
//! point.

use chrono::{DateTime, Utc};
use obsync_types::{Amount, Market, BASE_UNDERLYING_DECIMALS};

/// Fraction digits shown when a step size is not a power of ten
pub const FALLBACK_DISPLAY_DECIMALS: u32 = 4;

/// Insert thousands separators into a string of digits
///
/// Anything that is not a plain run of ASCII digits is returned unchanged.
pub fn format_integer_string(value: &str) -> String {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return value.to_string();
    }

    let len = value.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in value.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a raw amount with at most `display_decimals` fraction digits
///
/// Fraction digits are truncated, never rounded, and trailing zeros are
/// dropped. Malformed input formats as `0`.
///
/// ```
/// use obsync_sdk::display::format_coin_amount;
///
/// assert_eq!(format_coin_amount("1234567890123456789", 4, 18), "1.2345");
/// assert_eq!(format_coin_amount("1500000000000000000000", 2, 18), "1,500");
/// ```
pub fn format_coin_amount(raw: &str, display_decimals: u32, underlying_decimals: u32) -> String {
    if underlying_decimals == 0 {
        return format_integer_string(raw);
    }

    let value: Amount = raw.parse().unwrap_or_else(|_| Amount::zero());
    let scale = Amount::pow10(underlying_decimals);
    let integer = (value.as_biguint() / scale.as_biguint()).to_string();
    let integer = format_integer_string(&integer);

    if display_decimals == 0 {
        return integer;
    }

    let fraction = (value.as_biguint() % scale.as_biguint()).to_string();
    let fraction = format!("{:0>width$}", fraction, width = underlying_decimals as usize);
    let keep = (display_decimals as usize).min(fraction.len());
    let shown = fraction[..keep].trim_end_matches('0');

    if shown.is_empty() {
        integer
    } else {
        format!("{integer}.{shown}")
    }
}

/// [`format_coin_amount`] for an 18-decimal [`Amount`]
pub fn format_amount(amount: &Amount, display_decimals: u32) -> String {
    format_coin_amount(&amount.to_string(), display_decimals, BASE_UNDERLYING_DECIMALS)
}

/// Fraction digits implied by a raw step size
///
/// A step of `1` followed only by zeros means `18 - zeros` decimals, clamped
/// to `[0, 18]`. Any other step shows four decimals.
pub fn display_decimals_from_step_size(step_size: &str) -> u32 {
    let step = step_size.trim();
    let mut chars = step.chars();
    if chars.next() != Some('1') || !chars.all(|c| c == '0') {
        return FALLBACK_DISPLAY_DECIMALS;
    }

    let exponent = (step.len() - 1) as u32;
    BASE_UNDERLYING_DECIMALS.saturating_sub(exponent)
}

/// Render a microsecond timestamp as `HH:MM:SS.mmm` UTC, or `-` if invalid
pub fn format_timestamp(micros: &str) -> String {
    micros
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|us| i64::try_from(us / 1_000).ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Symbols and decimals used to render one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDisplay {
    /// Base asset symbol
    pub base: String,
    /// Quote asset symbol
    pub quote: String,
    /// Fraction digits for quantities
    pub quantity_decimals: u32,
    /// Fraction digits for prices
    pub price_decimals: u32,
}

impl MarketDisplay {
    /// Labels for a catalog entry
    ///
    /// A name such as `BTC-USDC` or `BTC/USDC` carries both symbols; the
    /// configured quote is used otherwise. A contract-address quote
    /// (`0x...`) is replaced by the name's quote when one is present.
    pub fn from_market(market: &Market) -> Self {
        let mut parts = market.config.name.splitn(2, ['-', '/']);
        let base = parts.next().unwrap_or_default().trim().to_string();
        let named_quote = parts.next().unwrap_or_default().trim().to_string();

        let quote = if named_quote.is_empty() {
            market.config.quote.clone()
        } else {
            named_quote
        };

        Self {
            base,
            quote,
            quantity_decimals: display_decimals_from_step_size(&market.config.step_size),
            price_decimals: display_decimals_from_step_size(&market.config.step_price),
        }
    }

    /// "BASE/QUOTE"
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Format a raw price
    pub fn price(&self, amount: &Amount) -> String {
        format_amount(amount, self.price_decimals)
    }

    /// Format a raw quantity
    pub fn quantity(&self, amount: &Amount) -> String {
        format_amount(amount, self.quantity_decimals)
    }
}

impl Default for MarketDisplay {
    fn default() -> Self {
        Self {
            base: "BASE".to_string(),
            quote: "QUOTE".to_string(),
            quantity_decimals: FALLBACK_DISPLAY_DECIMALS,
            price_decimals: FALLBACK_DISPLAY_DECIMALS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsync_types::MarketConfig;

    fn market(name: &str, quote: &str) -> Market {
        Market {
            market_id: "1".to_string(),
            config: MarketConfig {
                name: name.to_string(),
                quote: quote.to_string(),
                step_size: "1000000000000000".to_string(),
                step_price: "1000000000000000000".to_string(),
                maintenance_margin_factor: "0.03".to_string(),
                max_leverage: "20".to_string(),
                min_order_size: "1".to_string(),
                unlocked: true,
                open_interest_limit: "1000000".to_string(),
            },
        }
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(format_integer_string("0"), "0");
        assert_eq!(format_integer_string("999"), "999");
        assert_eq!(format_integer_string("1000"), "1,000");
        assert_eq!(format_integer_string("1234567"), "1,234,567");
        assert_eq!(format_integer_string("12ab"), "12ab");
    }

    #[test]
    fn test_coin_amount() {
        assert_eq!(format_coin_amount("1000000000000000000", 0, 18), "1");
        assert_eq!(format_coin_amount("1500000000000000000", 2, 18), "1.5");
        assert_eq!(format_coin_amount("1234567890123456789", 4, 18), "1.2345");
        assert_eq!(format_coin_amount("1999999999999999999", 2, 18), "1.99");
        assert_eq!(format_coin_amount("5", 18, 18), "0.000000000000000005");
        assert_eq!(format_coin_amount("1000", 0, 0), "1,000");
    }

    #[test]
    fn test_coin_amount_malformed() {
        assert_eq!(format_coin_amount("", 2, 18), "0");
        assert_eq!(format_coin_amount("abc", 2, 18), "0");
        assert_eq!(format_coin_amount("12.34", 2, 18), "0");
    }

    #[test]
    fn test_decimals_from_step_size() {
        assert_eq!(display_decimals_from_step_size("0.5"), 4);
        assert_eq!(display_decimals_from_step_size("0.01"), 4);
        assert_eq!(display_decimals_from_step_size("25"), 4);
        assert_eq!(display_decimals_from_step_size("1"), 18);
        assert_eq!(display_decimals_from_step_size("10"), 17);
        assert_eq!(display_decimals_from_step_size("  100  "), 16);
        assert_eq!(display_decimals_from_step_size("1000000000000000000"), 0);
        assert_eq!(display_decimals_from_step_size("10000000000000000000000"), 0);
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(format_timestamp("1734784104113018"), "12:28:24.113");
        assert_eq!(format_timestamp("not a number"), "-");
        assert_eq!(format_timestamp("1000000000000000000000000000000"), "-");
    }

    #[test]
    fn test_market_display() {
        let display = MarketDisplay::from_market(&market("BTC-USDC", "0xabc"));
        assert_eq!(display.symbol(), "BTC/USDC");
        assert_eq!(display.quantity_decimals, 3);
        assert_eq!(display.price_decimals, 0);

        let display = MarketDisplay::from_market(&market("ETH", "USDC"));
        assert_eq!(display.symbol(), "ETH/USDC");

        let price: Amount = "2500123400000000000000".parse().unwrap();
        assert_eq!(display.price(&price), "2,500");
        assert_eq!(display.quantity(&price), "2,500.123");
    }
}
