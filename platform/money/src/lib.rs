//! Fixed-scale decimal newtypes for the ledger core.
//!
//! The platform's AR, treasury, and party modules already reach for
//! `rust_decimal` wherever money crosses a wire or a database row; this crate
//! pulls that choice into one place and adds the two scales the ledger needs
//! beyond plain money (tax rates, FX rates) plus the currency-code and
//! posting-date validation every module's write path repeats.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("amount has more than {max_scale} fractional digits: {value}")]
    TooManyDecimals { value: String, max_scale: u32 },
    #[error("rate must be between 0 and 1, got {0}")]
    RateOutOfRange(String),
    #[error("amount must not be negative: {0}")]
    Negative(String),
}

/// Money amount, stored at a fixed scale of 2 and rounded half-to-even on
/// construction, matching the scale `ar-rs`'s invoice/payment tables already
/// use for `rust_decimal` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

pub const MONEY_SCALE: u32 = 2;
pub const RATE_SCALE: u32 = 4;
pub const FX_RATE_SCALE: u32 = 6;

impl Money {
    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Rounds `value` to [`MONEY_SCALE`] fractional digits using banker's
    /// rounding, the behavior spec'd for money rounding throughout the core.
    pub fn from_decimal(value: Decimal) -> Self {
        Money(value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven))
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn checked_add(self, other: Money) -> Self {
        Money::from_decimal(self.0 + other.0)
    }

    pub fn checked_sub(self, other: Money) -> Self {
        Money::from_decimal(self.0 - other.0)
    }

    pub fn negate(self) -> Self {
        Money::from_decimal(-self.0)
    }

    /// Exact conversion to integer minor units (cents), used at the boundary
    /// with storage that keeps money as `i64` minor units. Because `Money`
    /// is always scale-2, this multiply-and-truncate never loses precision
    /// the way the equivalent `f64` cast does.
    pub fn to_minor_units(&self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().expect("scale-2 money fits in i64 minor units")
    }

    pub fn from_minor_units(minor: i64) -> Self {
        Money(Decimal::new(minor, MONEY_SCALE))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.round_dp(MONEY_SCALE))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = std::convert::Infallible;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Ok(Money::from_decimal(value))
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Decimal {
        m.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        self.checked_add(rhs)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        self.checked_sub(rhs)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A tax rate in `[0, 1]`, stored at [`RATE_SCALE`] fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(MoneyError::RateOutOfRange(value.to_string()));
        }
        Ok(Rate(value.round_dp_with_strategy(
            RATE_SCALE,
            RoundingStrategy::MidpointNearestEven,
        )))
    }

    pub fn zero() -> Self {
        Rate(Decimal::ZERO)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Applies this rate to a money amount, rounding the result half-even to
    /// [`MONEY_SCALE`].
    pub fn apply(&self, amount: Money) -> Money {
        Money::from_decimal(amount.inner() * self.0)
    }
}

/// A foreign-exchange conversion rate, stored at [`FX_RATE_SCALE`] digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FxRate(Decimal);

impl FxRate {
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::Negative(value.to_string()));
        }
        Ok(FxRate(value.round_dp_with_strategy(
            FX_RATE_SCALE,
            RoundingStrategy::MidpointNearestEven,
        )))
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn convert(&self, amount: Money) -> Money {
        Money::from_decimal(amount.inner() * self.0)
    }
}

/// Validates a currency code is exactly three uppercase ASCII letters, the
/// ISO 4217 alpha shape the core's journal entries require.
pub fn validate_currency_code(code: &str) -> Result<(), MoneyError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(MoneyError::InvalidCurrency(code.to_string()))
    }
}
