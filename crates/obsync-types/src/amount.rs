//! Arbitrary-precision fixed-point amounts
//!
//! Prices and quantities travel on the wire as decimal strings holding
//! fixed-point integers (18 implied decimals for most markets). They routinely
//! exceed 2^53, so they are never routed through `f64`.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul};
use std::str::FromStr;
use thiserror::Error;

/// Number of implied decimals in on-chain amounts
pub const BASE_UNDERLYING_DECIMALS: u32 = 18;

/// Error returned when a decimal string is not a valid amount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input string was empty
    #[error("amount is empty")]
    Empty,

    /// The input contained something other than ASCII digits
    #[error("invalid amount {0:?}: only ASCII digits are allowed")]
    InvalidDigit(String),
}

/// Non-negative fixed-point integer of unbounded width
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(BigUint);

impl Amount {
    /// The zero amount
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// `10^exponent`, used for bucket scales and decimal shifts
    pub fn pow10(exponent: u32) -> Self {
        Self(BigUint::from(10u32).pow(exponent))
    }

    /// Wrap an existing big integer
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// Borrow the underlying big integer
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Consume into the underlying big integer
    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    /// True if every digit is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True if the value is exactly one
    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Truncate down to a multiple of `scale`: `(self / scale) * scale`
    ///
    /// A zero scale leaves the value unchanged.
    pub fn bucket(&self, scale: &Amount) -> Amount {
        if scale.is_zero() {
            return self.clone();
        }
        Amount((&self.0 / &scale.0) * &scale.0)
    }

    /// Saturating subtraction (`0` when `rhs > self`)
    pub fn saturating_sub(&self, rhs: &Amount) -> Amount {
        if rhs.0 > self.0 {
            Amount::zero()
        } else {
            Amount(&self.0 - &rhs.0)
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::InvalidDigit(s.to_string()));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Amount)
            .ok_or_else(|| AmountError::InvalidDigit(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl Mul<&Amount> for &Amount {
    type Output = Amount;

    fn mul(self, rhs: &Amount) -> Amount {
        Amount(&self.0 * &rhs.0)
    }
}

/// Integer (truncating) division. Dividing by zero yields zero.
impl Div<&Amount> for &Amount {
    type Output = Amount;

    fn div(self, rhs: &Amount) -> Amount {
        if rhs.is_zero() {
            return Amount::zero();
        }
        Amount(&self.0 / &rhs.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Accepts the canonical decimal string and, leniently, a non-negative JSON integer
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(u64),
        }

        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => Amount::from_str(&s).map_err(D::Error::custom),
            StringOrNumber::Number(n) => Ok(Amount::from(n)),
        }
    }
}
