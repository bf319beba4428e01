use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};

/// Number of decimal places carried by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents (half to even) and pin the scale to two places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(MONEY_SCALE);
    rounded
}

pub fn money_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Convert a configured amount into a fixed-point value.
pub fn money_from_f64(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(Error::InvalidValue(format!(
            "amount {value} is not a finite number"
        )));
    }
    Decimal::from_f64(value)
        .map(round_money)
        .ok_or_else(|| Error::InvalidValue(format!("amount {value} is out of range")))
}

pub fn to_cents(value: Decimal) -> Result<i64> {
    (round_money(value) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| Error::InvalidValue(format!("amount {value} does not fit in cents")))
}

/// Multiply by a rate expressed in basis points and round to cents.
pub fn apply_basis_points(value: Decimal, basis_points: u32) -> Decimal {
    round_money(value * Decimal::new(i64::from(basis_points), 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_points_round_to_cents() {
        let billed = money_from_cents(4200);
        assert_eq!(apply_basis_points(billed, 8000), money_from_cents(3360));
        assert_eq!(apply_basis_points(billed, 9500), money_from_cents(3990));
        assert_eq!(apply_basis_points(money_from_cents(3333), 3000), money_from_cents(1000));
    }

    #[test]
    fn converts_configured_amounts() {
        assert_eq!(money_from_f64(15.0).expect("amount"), money_from_cents(1500));
        assert_eq!(to_cents(money_from_cents(123)).expect("cents"), 123);
        assert!(money_from_f64(f64::NAN).is_err());
    }
}
