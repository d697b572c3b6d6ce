//! Money arithmetic
//!
//! All amounts are `Decimal` dollars. Rounding happens once per line and once
//! for tax, always to cents with midpoints away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// New Jersey sales tax, 6.625 %
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(6625, 0, 0, false, 5);

/// Round to two decimal places, midpoints away from zero
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax owed on a taxable subtotal
pub fn tax(subtotal: Decimal, rate: Decimal) -> Decimal {
    round_cents(subtotal * rate)
}

/// Sum already-rounded amounts
pub fn sum<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, |acc, a| acc + a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate() {
        assert_eq!(DEFAULT_TAX_RATE.to_string(), "0.06625");
    }

    #[test]
    fn test_round_cents_midpoint_goes_up() {
        assert_eq!(round_cents(Decimal::new(6625, 3)), Decimal::new(663, 2));
        assert_eq!(round_cents(Decimal::new(-6625, 3)), Decimal::new(-663, 2));
        assert_eq!(round_cents(Decimal::new(64925, 4)), Decimal::new(649, 2));
    }

    #[test]
    fn test_tax_on_typical_amounts() {
        // four weeks at $3.50/day
        assert_eq!(tax(Decimal::new(9800, 2), DEFAULT_TAX_RATE), Decimal::new(649, 2));
        assert_eq!(tax(Decimal::new(10000, 2), DEFAULT_TAX_RATE), Decimal::new(663, 2));
        assert_eq!(tax(Decimal::ZERO, DEFAULT_TAX_RATE), Decimal::ZERO);
    }

    #[test]
    fn test_sum() {
        let total = sum([Decimal::new(150, 2), Decimal::new(250, 2), Decimal::new(-100, 2)]);
        assert_eq!(total, Decimal::new(300, 2));
    }
}
