//! Invoice line assembly
//!
//! [`InvoiceAssembler`] collects rent, catalog services, ad-hoc fees and
//! discounts, then computes the totals:
//!
//! ```text
//! subtotal = Σ line.amount
//! tax      = round_cents(Σ taxable line.amount × rate)
//! total    = subtotal + tax
//! ```

use super::money::{round_cents, sum, tax};
use super::rates::{period_rent, rental_periods};
use crate::config::BillingConfig;
use crate::core::error::BillingError;
use crate::entities::service_item::{ServiceItem, ServiceItemStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

crate::string_enum!(LineKind {
    Rent => "rent",
    Service => "service",
    Fee => "fee",
    Discount => "discount",
});

/// One priced line on an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub kind: LineKind,
    /// Catalog code for service lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub taxable: bool,
}

impl InvoiceLine {
    pub fn new(
        description: impl Into<String>,
        kind: LineKind,
        quantity: u32,
        unit_price: Decimal,
        taxable: bool,
    ) -> Self {
        Self {
            description: description.into(),
            kind,
            code: None,
            quantity,
            unit_price,
            amount: round_cents(unit_price * Decimal::from(quantity)),
            taxable,
        }
    }

    pub fn is_rent(&self) -> bool {
        self.kind == LineKind::Rent
    }
}

/// Computed invoice totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub taxable_amount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn compute(lines: &[InvoiceLine], tax_rate: Decimal) -> Self {
        let subtotal = sum(lines.iter().map(|l| l.amount));
        let taxable_amount = sum(lines.iter().filter(|l| l.taxable).map(|l| l.amount));
        let tax = tax(taxable_amount, tax_rate);
        Self {
            subtotal,
            taxable_amount,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Result of a finished assembly
#[derive(Debug, Clone, Serialize)]
pub struct AssembledInvoice {
    pub lines: Vec<InvoiceLine>,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
    /// Exclusive end of the last rent line, if any rent was billed
    pub rent_through: Option<NaiveDate>,
}

/// Builder for invoice lines and totals
#[derive(Debug, Clone)]
pub struct InvoiceAssembler {
    tax_rate: Decimal,
    tax_rent: bool,
    period_days: u32,
    lines: Vec<InvoiceLine>,
    rent_through: Option<NaiveDate>,
}

impl InvoiceAssembler {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            tax_rate: config.tax_rate,
            tax_rent: config.tax_rent,
            period_days: config.rental_period_days,
            lines: Vec::new(),
            rent_through: None,
        }
    }

    /// Rent for `[from, to)`: one line per whole period plus a prorated tail
    pub fn rent(mut self, daily_rate: Decimal, from: NaiveDate, to: NaiveDate) -> Self {
        for period in rental_periods(from, to, self.period_days) {
            let line = if period.full {
                InvoiceLine::new(
                    format!(
                        "Device rental {} to {} ({} days)",
                        period.start, period.end, period.days
                    ),
                    LineKind::Rent,
                    1,
                    period_rent(daily_rate, self.period_days),
                    self.tax_rent,
                )
            } else {
                InvoiceLine::new(
                    format!(
                        "Device rental {} to {} ({} days, prorated)",
                        period.start, period.end, period.days
                    ),
                    LineKind::Rent,
                    period.days,
                    daily_rate,
                    self.tax_rent,
                )
            };
            self.lines.push(line);
            self.rent_through = Some(period.end);
        }
        self
    }

    pub fn service(mut self, item: &ServiceItem, quantity: u32) -> Self {
        let mut line = InvoiceLine::new(
            item.description.clone(),
            LineKind::Service,
            quantity,
            item.price,
            item.taxable,
        );
        line.code = Some(item.code.clone());
        self.lines.push(line);
        self
    }

    /// Add one line per code, priced from the active catalog
    pub fn services(mut self, codes: &[String], catalog: &[ServiceItem]) -> Result<Self, BillingError> {
        for code in codes {
            let item = catalog
                .iter()
                .find(|item| {
                    item.code.eq_ignore_ascii_case(code) && item.status == ServiceItemStatus::Active
                })
                .ok_or_else(|| BillingError::UnknownServiceCode(code.clone()))?;
            self = self.service(item, 1);
        }
        Ok(self)
    }

    pub fn fee(mut self, description: impl Into<String>, amount: Decimal, taxable: bool) -> Self {
        self.lines
            .push(InvoiceLine::new(description, LineKind::Fee, 1, amount, taxable));
        self
    }

    /// Discounts are stored negative and never taxed
    pub fn discount(mut self, description: impl Into<String>, amount: Decimal) -> Self {
        self.lines.push(InvoiceLine::new(
            description,
            LineKind::Discount,
            1,
            -amount.abs(),
            false,
        ));
        self
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.lines, self.tax_rate)
    }

    pub fn finish(self) -> Result<AssembledInvoice, BillingError> {
        if self.lines.is_empty() {
            return Err(BillingError::EmptyInvoice);
        }
        let totals = self.totals();
        if totals.total.is_sign_negative() && !totals.total.is_zero() {
            return Err(BillingError::InvalidAmount {
                amount: totals.total,
                message: "discounts exceed the invoice charges".to_string(),
            });
        }
        Ok(AssembledInvoice {
            lines: self.lines,
            totals,
            rent_through: self.rent_through,
        })
    }
}

/// `<prefix>-<YYYYMMDD>-<sequence>`, sequence zero-padded to four digits
pub fn invoice_number(prefix: &str, issue_date: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, issue_date.format("%Y%m%d"), sequence)
}
