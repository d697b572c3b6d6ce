//! Device rental pricing
//!
//! Rent accrues per calendar day over half-open spans `[from, to)`: the
//! install day is billed, the end day is not.

use super::money::round_cents;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

/// Days in a standard rental period
pub const RENTAL_PERIOD_DAYS: u32 = 28;

/// Number of billable days in `[from, to)`, never negative
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().max(0)
}

/// Rent for one standard four-week period
pub fn four_week_rent(daily_rate: Decimal) -> Decimal {
    period_rent(daily_rate, RENTAL_PERIOD_DAYS)
}

/// Rent for a period of `period_days` days
pub fn period_rent(daily_rate: Decimal, period_days: u32) -> Decimal {
    round_cents(daily_rate * Decimal::from(period_days))
}

/// Rent for the days in `[from, to)`; zero when `to <= from`
pub fn prorated_rent(daily_rate: Decimal, from: NaiveDate, to: NaiveDate) -> Decimal {
    round_cents(daily_rate * Decimal::from(days_between(from, to)))
}

/// A slice of a rental span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RentPeriod {
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
    pub days: u32,
    /// `true` for a whole period, `false` for the prorated tail
    pub full: bool,
}

/// Split `[from, to)` into whole periods followed by at most one shorter tail
pub fn rental_periods(from: NaiveDate, to: NaiveDate, period_days: u32) -> Vec<RentPeriod> {
    let mut periods = Vec::new();
    if period_days == 0 {
        return periods;
    }

    let mut start = from;
    while start < to {
        let remaining = days_between(start, to);
        let days = remaining.min(i64::from(period_days));
        let end = start + Duration::days(days);
        periods.push(RentPeriod {
            start,
            end,
            days: u32::try_from(days).unwrap_or(period_days),
            full: days == i64::from(period_days),
        });
        start = end;
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_four_week_rent() {
        assert_eq!(four_week_rent(Decimal::new(350, 2)), Decimal::new(9800, 2));
        assert_eq!(period_rent(Decimal::new(350, 2), 30), Decimal::new(10500, 2));
    }

    #[test]
    fn test_prorated_rent_is_half_open() {
        let rate = Decimal::new(350, 2);
        assert_eq!(prorated_rent(rate, date(2024, 3, 1), date(2024, 3, 11)), Decimal::new(3500, 2));
        assert_eq!(prorated_rent(rate, date(2024, 3, 1), date(2024, 3, 1)), Decimal::ZERO);
        assert_eq!(prorated_rent(rate, date(2024, 3, 5), date(2024, 3, 1)), Decimal::ZERO);
    }

    #[test]
    fn test_rental_periods_split_with_tail() {
        let periods = rental_periods(date(2024, 1, 1), date(2024, 3, 7), 28);
        assert_eq!(periods.len(), 3);
        assert!(periods[0].full && periods[1].full);
        assert_eq!(periods[1].end, date(2024, 2, 26));
        assert_eq!(periods[2].days, 10);
        assert!(!periods[2].full);
        assert_eq!(periods[2].end, date(2024, 3, 7));
    }

    #[test]
    fn test_rental_periods_empty_span() {
        assert!(rental_periods(date(2024, 1, 1), date(2024, 1, 1), 28).is_empty());
        assert!(rental_periods(date(2024, 1, 1), date(2024, 2, 1), 0).is_empty());
    }
}
