//! Client account balance
//!
//! ```text
//! elapsed_days  = days in [install_date, min(as_of, removed_on))
//! rent_accrued  = elapsed_days × daily_rate
//! other_charges = Σ (invoice.total − invoice rent lines)   non-void invoices
//! payments      = Σ payment.amount                         completed payments
//! balance       = rent_accrued + other_charges − payments
//! ```
//!
//! Rent is counted once, as it accrues, whether or not it was invoiced yet.
//! Tax charged on invoiced rent stays in `other_charges`. A negative balance
//! is a credit on the account.

use super::money::round_cents;
use super::rates::days_between;
use crate::core::Entity;
use crate::entities::client::Client;
use crate::entities::invoice::Invoice;
use crate::entities::payment::Payment;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceStatement {
    pub client_id: Uuid,
    pub as_of: NaiveDate,
    pub install_date: Option<NaiveDate>,
    /// Exclusive end of the accrual span
    pub accrued_through: Option<NaiveDate>,
    pub elapsed_days: i64,
    pub daily_rate: Decimal,
    pub rent_accrued: Decimal,
    pub other_charges: Decimal,
    pub payments: Decimal,
    pub balance: Decimal,
    /// Rent is covered by payments up to (excluding) this day
    pub paid_through: Option<NaiveDate>,
}

impl BalanceStatement {
    pub fn is_credit(&self) -> bool {
        self.balance.is_sign_negative() && !self.balance.is_zero()
    }
}

/// Days of rent accrued by `as_of`
pub fn elapsed_days(client: &Client, as_of: NaiveDate) -> i64 {
    match client.install_date {
        Some(install) => days_between(install, accrual_end(client, as_of)),
        None => 0,
    }
}

fn accrual_end(client: &Client, as_of: NaiveDate) -> NaiveDate {
    match client.removed_on {
        Some(removed) => as_of.min(removed),
        None => as_of,
    }
}

/// Last day (exclusive) whose rent is covered by `toward_rent`.
///
/// `None` when the credit reaches past the last representable date. A zero
/// rate covers nothing beyond the install day.
fn covered_until(install: NaiveDate, daily_rate: Decimal, toward_rent: Decimal) -> Option<NaiveDate> {
    let toward_rent = toward_rent.max(Decimal::ZERO);
    if daily_rate <= Decimal::ZERO {
        return Some(install);
    }
    let days = toward_rent
        .checked_div(daily_rate)
        .and_then(|d| d.floor().to_u64())?;
    install.checked_add_days(Days::new(days))
}

/// Compute the statement for one client.
///
/// Records belonging to other clients, soft-deleted records, void invoices
/// and non-completed payments are ignored.
pub fn balance(
    client: &Client,
    as_of: NaiveDate,
    invoices: &[Invoice],
    payments: &[Payment],
) -> BalanceStatement {
    let elapsed = elapsed_days(client, as_of);
    let rent_accrued = round_cents(client.daily_rate * Decimal::from(elapsed));

    let other_charges = invoices
        .iter()
        .filter(|i| i.client_id == client.id && !i.is_void() && !i.is_deleted())
        .fold(Decimal::ZERO, |acc, i| acc + (i.total - i.rent_amount()));

    let paid = payments
        .iter()
        .filter(|p| p.client_id == client.id && p.is_completed() && !p.is_deleted())
        .fold(Decimal::ZERO, |acc, p| acc + p.amount);

    let paid_through = client
        .install_date
        .and_then(|install| covered_until(install, client.daily_rate, paid - other_charges));

    BalanceStatement {
        client_id: client.id,
        as_of,
        install_date: client.install_date,
        accrued_through: client.install_date.map(|_| accrual_end(client, as_of)),
        elapsed_days: elapsed,
        daily_rate: client.daily_rate,
        rent_accrued,
        other_charges,
        payments: paid,
        balance: rent_accrued + other_charges - paid,
        paid_through,
    }
}
