//! Issued invoices
//!
//! Invoices are written by the billing service only. The generic update can
//! move the due date; money fields change through payments and voids.

use crate::billing::invoice::InvoiceLine;
use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError, ValidationError};
use crate::core::service::{DataService, fetch_required};
use crate::core::{Entity, NoInput, Resource};
use crate::storage::Stores;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(InvoiceStatus {
    Open => "open",
    Partial => "partial",
    Paid => "paid",
    Void => "void",
});

crate::impl_data_entity!(Invoice, "invoice", "invoices", InvoiceStatus, ["name", "number", "client_id", "appointment_id", "issue_date", "status"], {
    number: String,
    client_id: Uuid,
    #[serde(default)]
    appointment_id: Option<Uuid>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    lines: Vec<InvoiceLine>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
    amount_paid: Decimal,
    /// Exclusive end of the rent billed on this invoice
    #[serde(default)]
    rent_through: Option<NaiveDate>,
});

impl Invoice {
    pub fn balance_due(&self) -> Decimal {
        (self.total - self.amount_paid).max(Decimal::ZERO)
    }

    /// Sum of the rent lines on this invoice
    pub fn rent_amount(&self) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.is_rent())
            .fold(Decimal::ZERO, |acc, l| acc + l.amount)
    }

    pub fn is_void(&self) -> bool {
        self.status == InvoiceStatus::Void
    }

    /// Record a change in the amount paid and recompute the status
    pub fn apply_paid(&mut self, amount_paid: Decimal) {
        self.amount_paid = amount_paid.max(Decimal::ZERO);
        if !self.is_void() {
            self.status = invoice_status(self.total, self.amount_paid);
        }
        self.touch();
    }
}

/// `paid` once fully covered, `partial` when something was paid, else `open`
pub fn invoice_status(total: Decimal, paid: Decimal) -> InvoiceStatus {
    if paid >= total {
        InvoiceStatus::Paid
    } else if paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Open
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoice {
    pub due_date: Option<NaiveDate>,
}

#[async_trait]
impl Resource for Invoice {
    type Create = NoInput;
    type Update = UpdateInvoice;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.invoices.clone()
    }

    fn from_create(input: NoInput, _config: &AppConfig) -> AppResult<Self> {
        match input {}
    }

    fn apply_update(&mut self, input: UpdateInvoice, _config: &AppConfig) -> AppResult<()> {
        if self.is_void() {
            return Err(EntityError::invalid_state(
                "invoice",
                self.id,
                self.status(),
                "void invoices are read-only",
            )
            .into());
        }
        if let Some(due_date) = input.due_date {
            if due_date < self.issue_date {
                return Err(
                    ValidationError::field("due_date", "must not be before the issue date").into(),
                );
            }
            self.due_date = due_date;
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        fetch_required(stores.clients.as_ref(), self.client_id).await?;
        Ok(())
    }

    async fn check_delete(&self, _stores: &Stores) -> AppResult<()> {
        if self.amount_paid > Decimal::ZERO {
            return Err(EntityError::invalid_state(
                "invoice",
                self.id,
                self.status(),
                "invoices with payments must be voided, not deleted",
            )
            .into());
        }
        Ok(())
    }
}
