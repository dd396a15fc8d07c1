//! Integer-cents and quantity primitives.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Prices and totals are whole cents (`i64`). Quantities are days expressed
//! as `rust_decimal::Decimal` with at most two fractional digits, persisted
//! as integer hundredths.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits a quantity may carry.
pub const QUANTITY_SCALE: u32 = 2;

/// Largest accepted quantity on one entry.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest accepted unit price in cents.
///
/// Together with [`MAX_QUANTITY`] this keeps every line total inside `i64`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000_000;

/// Errors raised by the amount helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The quantity carries more fractional digits than can be stored.
    #[error("quantity has more than two fractional digits")]
    TooPrecise,

    /// The value does not fit into the storage integer.
    #[error("amount overflow")]
    Overflow,
}

/// Computes `quantity × unit_price_cents`, rounded half-up to whole cents.
///
/// The product is computed in `Decimal` so no intermediate truncation happens.
pub fn line_total_cents(quantity: Decimal, unit_price_cents: i64) -> Result<i64, QuantityError> {
    let exact = quantity
        .checked_mul(Decimal::from(unit_price_cents))
        .ok_or(QuantityError::Overflow)?;
    let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    decimal_to_i64(rounded)
}

/// Converts a quantity into integer hundredths for storage.
pub fn quantity_to_hundredths(quantity: Decimal) -> Result<i64, QuantityError> {
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err(QuantityError::TooPrecise);
    }
    let scaled = quantity
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(QuantityError::Overflow)?;
    decimal_to_i64(scaled.trunc())
}

/// Converts stored integer hundredths back into a quantity.
#[must_use]
pub fn hundredths_to_quantity(hundredths: i64) -> Decimal {
    Decimal::new(hundredths, QUANTITY_SCALE)
}

/// Converts cents into major currency units (`12345` → `123.45`).
#[must_use]
pub fn cents_to_major(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Formats cents as major units with exactly two decimals.
#[must_use]
pub fn format_major(cents: i64) -> String {
    format!("{:.2}", cents_to_major(cents))
}

/// Formats a quantity with exactly two decimals.
#[must_use]
pub fn format_quantity(quantity: Decimal) -> String {
    format!("{:.2}", quantity.round_dp(QUANTITY_SCALE))
}

/// Sums cents without wrapping.
pub fn checked_sum_cents<I>(values: I) -> Result<i64, QuantityError>
where
    I: IntoIterator<Item = i64>,
{
    values
        .into_iter()
        .try_fold(0_i64, |acc, v| acc.checked_add(v).ok_or(QuantityError::Overflow))
}

fn decimal_to_i64(value: Decimal) -> Result<i64, QuantityError> {
    value.to_i64().ok_or(QuantityError::Overflow)
}

/// ISO 4217 currency codes accepted for activity reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro
    Eur,
    /// US Dollar
    Usd,
    /// Pound Sterling
    Gbp,
    /// Swiss Franc
    Chf,
    /// Canadian Dollar
    Cad,
}

impl Currency {
    /// Every accepted currency.
    pub const ALL: [Self; 5] = [Self::Eur, Self::Usd, Self::Gbp, Self::Chf, Self::Cad];

    /// Returns the ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
            Self::Cad => "CAD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EUR" => Ok(Self::Eur),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            "CHF" => Ok(Self::Chf),
            "CAD" => Ok(Self::Cad),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
