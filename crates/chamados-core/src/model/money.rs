//! Monetary helpers.
//!
//! Amounts are [`Decimal`] in memory and integer cents at rest. Everything is
//! rounded to two places on the way in so that comparisons between a stored
//! total and a freshly computed one never disagree on trailing digits.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, Result};

/// Round half away from zero to cents.
#[must_use]
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Convert an amount to integer cents for storage.
///
/// # Errors
///
/// Returns [`EngineError::Invalid`] if the amount does not fit in an `i64`
/// number of cents.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    let rounded = normalize(amount);
    i64::try_from(rounded.mantissa())
        .map_err(|_| EngineError::invalid("amount", format!("{rounded} is out of range")))
}

#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// `quantity × unit_price`, rounded to cents.
#[must_use]
pub fn line_total(quantity: u32, unit_price: Decimal) -> Decimal {
    normalize(Decimal::from(quantity) * unit_price)
}

/// Render with exactly two decimal places (`"100.00"`).
#[must_use]
pub fn display(amount: Decimal) -> String {
    normalize(amount).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn cents_round_trip_keeps_two_places() {
        let cents = to_cents(dec("45.5")).expect("in range");
        assert_eq!(cents, 4550);
        assert_eq!(from_cents(cents).to_string(), "45.50");
    }

    #[test]
    fn normalize_rounds_half_up() {
        assert_eq!(normalize(dec("0.005")), dec("0.01"));
        assert_eq!(normalize(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(2, dec("50")), dec("100.00"));
        assert_eq!(display(line_total(3, dec("19.99"))), "59.97");
    }

    #[test]
    fn display_pads_zero() {
        assert_eq!(display(Decimal::ZERO), "0.00");
    }
}
