//! Billing operations that read and write records
//!
//! Invoice numbering, invoice `amount_paid` and the client's billed-through
//! date are read-modify-write cycles, so every mutating operation runs under
//! the shared store write lock.

use super::balance::{BalanceStatement, balance};
use super::invoice::{AssembledInvoice, InvoiceAssembler, invoice_number};
use super::reconcile::{PlannedTender, Tender, plan_tenders};
use crate::config::AppConfig;
use crate::core::error::{AppResult, BillingError, EntityError, PaymentError};
use crate::core::events::{BillingEvent, DomainEvent, EventBus};
use crate::core::service::fetch_required;
use crate::core::{Data, Entity};
use crate::entities::appointment::AppointmentStatus;
use crate::entities::client::Client;
use crate::entities::invoice::{Invoice, invoice_status};
use crate::entities::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::entities::service_item::ServiceItem;
use crate::gateway::{ChargeOutcome, ChargeRequest, PaymentGateway};
use crate::storage::Stores;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn default_taxable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeeRequest {
    #[validate(length(min = 1, max = 128))]
    pub description: String,
    #[validate(custom(function = "crate::core::validation::validators::positive_amount"))]
    pub amount: Decimal,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DiscountRequest {
    #[validate(length(min = 1, max = 128))]
    pub description: String,
    #[validate(custom(function = "crate::core::validation::validators::positive_amount"))]
    pub amount: Decimal,
}

/// Body of `POST /invoices/preview` and `POST /invoices/assemble`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InvoiceRequest {
    pub client_id: Uuid,
    /// Bill rent from the first unbilled day up to (excluding) this day
    #[serde(default)]
    pub rent_through: Option<NaiveDate>,
    #[serde(default)]
    pub service_codes: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub fees: Vec<FeeRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub discounts: Vec<DiscountRequest>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
}

/// Body of the payment endpoints
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentRequest {
    #[validate(length(min = 1, max = 8), nested)]
    pub tenders: Vec<Tender>,
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payments: Vec<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Invoice>,
    pub total_applied: Decimal,
    pub change_due: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_due: Option<Decimal>,
}

pub struct BillingService {
    stores: Stores,
    config: Arc<AppConfig>,
    gateway: Arc<dyn PaymentGateway>,
    events: EventBus,
}

impl BillingService {
    pub fn new(
        stores: Stores,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventBus,
    ) -> Self {
        Self {
            stores,
            config,
            gateway,
            events,
        }
    }

    /// Account statement for one client
    pub async fn balance(&self, client_id: Uuid, as_of: NaiveDate) -> AppResult<BalanceStatement> {
        let client = fetch_required(self.stores.clients.as_ref(), client_id).await?;
        let invoices = self.stores.invoices.search("client_id", &client_id.to_string()).await?;
        let payments = self.stores.payments.search("client_id", &client_id.to_string()).await?;
        Ok(balance(&client, as_of, &invoices, &payments))
    }

    /// Price an invoice without saving it
    pub async fn preview(&self, request: &InvoiceRequest, today: NaiveDate) -> AppResult<AssembledInvoice> {
        let client = fetch_required(self.stores.clients.as_ref(), request.client_id).await?;
        self.assemble_lines(&client, request, today).await
    }

    /// Price and save an invoice, advancing the client's billed-through date
    pub async fn assemble(&self, request: InvoiceRequest, today: NaiveDate) -> AppResult<Invoice> {
        let _guard = self.stores.write_lock.acquire().await;

        let client = fetch_required(self.stores.clients.as_ref(), request.client_id).await?;
        let assembled = self.assemble_lines(&client, &request, today).await?;
        let issue_date = request.issue_date.unwrap_or(today);
        self.issue(client, None, issue_date, assembled).await
    }

    /// Bill a completed appointment: its service codes plus rent up to the visit
    pub async fn invoice_appointment(&self, appointment_id: Uuid, today: NaiveDate) -> AppResult<Invoice> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut appointment = fetch_required(self.stores.appointments.as_ref(), appointment_id).await?;
        if appointment.invoice_id.is_some() {
            return Err(EntityError::invalid_state(
                "appointment",
                appointment.id,
                appointment.status(),
                "appointment has already been invoiced",
            )
            .into());
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(EntityError::invalid_state(
                "appointment",
                appointment.id,
                appointment.status(),
                "only completed appointments can be invoiced",
            )
            .into());
        }

        let client = fetch_required(self.stores.clients.as_ref(), appointment.client_id).await?;
        let catalog = self.catalog().await?;

        let mut assembler = InvoiceAssembler::new(&self.config.billing)
            .services(&appointment.service_codes, &catalog)?;
        if let Some(from) = client.unbilled_from() {
            assembler = assembler.rent(client.daily_rate, from, rent_end(&client, appointment.scheduled_date));
        }
        let assembled = assembler.finish()?;

        let invoice = self
            .issue(client, Some(appointment.id), today, assembled)
            .await?;

        appointment.invoice_id = Some(invoice.id);
        appointment.touch();
        self.stores.appointments.save(appointment).await?;

        Ok(invoice)
    }

    /// Apply tenders to an invoice
    pub async fn pay_invoice(
        &self,
        invoice_id: Uuid,
        request: PaymentRequest,
        today: NaiveDate,
    ) -> AppResult<PaymentReceipt> {
        let _guard = self.stores.write_lock.acquire().await;

        let invoice = fetch_required(self.stores.invoices.as_ref(), invoice_id).await?;
        if invoice.is_void() || invoice.balance_due().is_zero() {
            return Err(EntityError::invalid_state(
                "invoice",
                invoice.id,
                invoice.status(),
                "invoice does not accept payments",
            )
            .into());
        }
        let client = fetch_required(self.stores.clients.as_ref(), invoice.client_id).await?;
        self.take_payment(&client, Some(invoice), request, today).await
    }

    /// Apply tenders to a client account without an invoice
    pub async fn pay_account(
        &self,
        client_id: Uuid,
        request: PaymentRequest,
        today: NaiveDate,
    ) -> AppResult<PaymentReceipt> {
        let _guard = self.stores.write_lock.acquire().await;

        let client = fetch_required(self.stores.clients.as_ref(), client_id).await?;
        self.take_payment(&client, None, request, today).await
    }

    /// Void a completed payment and take it back off its invoice
    pub async fn void_payment(&self, payment_id: Uuid) -> AppResult<Payment> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut payment = fetch_required(self.stores.payments.as_ref(), payment_id).await?;
        if !payment.is_completed() {
            return Err(EntityError::invalid_state(
                "payment",
                payment.id,
                payment.status(),
                "only completed payments can be voided",
            )
            .into());
        }

        if let Some(transaction_id) = payment
            .gateway_transaction_id
            .as_deref()
            .filter(|_| payment.method == PaymentMethod::Card)
        {
            self.gateway.void(transaction_id).await?;
        }

        payment.set_status(PaymentStatus::Voided);
        let payment = self.stores.payments.save(payment).await?;

        if let Some(invoice_id) = payment.invoice_id {
            if let Some(mut invoice) = self.stores.invoices.get(&invoice_id).await? {
                invoice.apply_paid(invoice.amount_paid - payment.amount);
                self.stores.invoices.save(invoice).await?;
            }
        }

        tracing::info!(payment_id = %payment.id, amount = %payment.amount, "payment voided");
        self.events.publish(DomainEvent::Billing(BillingEvent::PaymentVoided {
            payment_id: payment.id,
            amount: payment.amount,
        }));

        Ok(payment)
    }

    async fn catalog(&self) -> AppResult<Vec<ServiceItem>> {
        Ok(self
            .stores
            .services
            .list()
            .await?
            .into_iter()
            .filter(|item| !item.is_deleted())
            .collect())
    }

    async fn assemble_lines(
        &self,
        client: &Client,
        request: &InvoiceRequest,
        today: NaiveDate,
    ) -> AppResult<AssembledInvoice> {
        let mut assembler = InvoiceAssembler::new(&self.config.billing);

        if let Some(through) = request.rent_through {
            let from = client
                .unbilled_from()
                .ok_or(BillingError::NotInstalled(client.id))?;
            assembler = assembler.rent(client.daily_rate, from, rent_end(client, through));
        }
        if !request.service_codes.is_empty() {
            let catalog = self.catalog().await?;
            assembler = assembler.services(&request.service_codes, &catalog)?;
        }
        for fee in &request.fees {
            assembler = assembler.fee(fee.description.trim(), fee.amount, fee.taxable);
        }
        for discount in &request.discounts {
            assembler = assembler.discount(discount.description.trim(), discount.amount);
        }

        tracing::debug!(client_id = %client.id, %today, lines = assembler.lines().len(), "invoice assembled");
        Ok(assembler.finish()?)
    }

    /// Number, save and announce an invoice; caller holds the write lock
    async fn issue(
        &self,
        mut client: Client,
        appointment_id: Option<Uuid>,
        issue_date: NaiveDate,
        assembled: AssembledInvoice,
    ) -> AppResult<Invoice> {
        let billing = &self.config.billing;
        let number = self.next_number(issue_date).await?;
        let totals = assembled.totals;

        let invoice = Invoice::new(
            number.clone(),
            invoice_status(totals.total, Decimal::ZERO),
            number,
            client.id,
            appointment_id,
            issue_date,
            issue_date + Duration::days(i64::from(billing.payment_terms_days)),
            assembled.lines,
            totals.subtotal,
            totals.tax,
            totals.total,
            Decimal::ZERO,
            assembled.rent_through,
        );
        let invoice = self.stores.invoices.create(invoice).await?;

        if let Some(through) = assembled.rent_through {
            client.billed_through = Some(client.billed_through.map_or(through, |b| b.max(through)));
            client.touch();
            self.stores.clients.save(client).await?;
        }

        tracing::info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            total = %invoice.total,
            "invoice issued"
        );
        self.events.publish(DomainEvent::Billing(BillingEvent::InvoiceIssued {
            invoice_id: invoice.id,
            client_id: invoice.client_id,
            number: invoice.number.clone(),
            total: invoice.total,
        }));

        Ok(invoice)
    }

    async fn next_number(&self, issue_date: NaiveDate) -> AppResult<String> {
        let prefix = &self.config.billing.invoice_prefix;
        let day_prefix = format!("{}-{}-", prefix, issue_date.format("%Y%m%d"));
        let issued_that_day = self
            .stores
            .invoices
            .list()
            .await?
            .iter()
            .filter(|i| i.number.starts_with(&day_prefix))
            .count();
        let sequence = u32::try_from(issued_that_day).unwrap_or(u32::MAX - 1) + 1;
        Ok(invoice_number(prefix, issue_date, sequence))
    }

    /// Charge cards, then record every tender; caller holds the write lock
    async fn take_payment(
        &self,
        client: &Client,
        invoice: Option<Invoice>,
        request: PaymentRequest,
        today: NaiveDate,
    ) -> AppResult<PaymentReceipt> {
        let plan = plan_tenders(invoice.as_ref().map(Invoice::balance_due), &request.tenders)?;
        let invoice_id = invoice.as_ref().map(|i| i.id);
        let received_date = request.received_date.unwrap_or(today);

        let mut approved: Vec<String> = Vec::new();
        for card in plan.cards() {
            let charge = ChargeRequest {
                client_id: client.id,
                invoice_id,
                amount: card.amount,
                token: card.token.clone().unwrap_or_default(),
                description: match &invoice {
                    Some(invoice) => format!("Invoice {}", invoice.number),
                    None => format!("Account payment {}", client.name()),
                },
            };
            match self.gateway.charge(&charge).await {
                Ok(ChargeOutcome::Approved { transaction_id, .. }) => approved.push(transaction_id),
                Ok(ChargeOutcome::Declined { reason }) => {
                    let voided = self.roll_back(&approved).await;
                    tracing::warn!(client_id = %client.id, amount = %card.amount, %reason, "card declined");
                    self.events.publish(DomainEvent::Billing(BillingEvent::CardDeclined {
                        client_id: client.id,
                        amount: card.amount,
                        reason: reason.clone(),
                    }));
                    return Err(PaymentError::Declined { reason, voided }.into());
                }
                Err(err) => {
                    self.roll_back(&approved).await;
                    tracing::warn!(client_id = %client.id, error = %err, "gateway failure");
                    return Err(err.into());
                }
            }
        }

        let mut transactions = approved.iter().cloned();
        let mut payments = Vec::with_capacity(plan.tenders.len());
        for tender in &plan.tenders {
            let transaction_id = match tender.method {
                PaymentMethod::Card => transactions.next(),
                _ => None,
            };
            match self
                .record(client.id, invoice_id, tender, received_date, transaction_id)
                .await
            {
                Ok(payment) => payments.push(payment),
                Err(err) => {
                    self.undo_payment(client.id, &approved, payments).await;
                    return Err(err);
                }
            }
        }

        let invoice = match invoice {
            Some(mut invoice) => {
                invoice.apply_paid(invoice.amount_paid + plan.total_applied);
                match self.stores.invoices.save(invoice).await {
                    Ok(invoice) => Some(invoice),
                    Err(err) => {
                        self.undo_payment(client.id, &approved, payments).await;
                        return Err(err.into());
                    }
                }
            }
            None => None,
        };

        tracing::info!(
            client_id = %client.id,
            total = %plan.total_applied,
            change = %plan.change_due,
            tenders = payments.len(),
            "payment taken"
        );

        Ok(PaymentReceipt {
            payments,
            invoice,
            total_applied: plan.total_applied,
            change_due: plan.change_due,
            remaining_due: plan.remaining_due,
        })
    }

    async fn record(
        &self,
        client_id: Uuid,
        invoice_id: Option<Uuid>,
        tender: &PlannedTender,
        received_date: NaiveDate,
        transaction_id: Option<String>,
    ) -> AppResult<Payment> {
        let payment = Payment::new(
            Payment::label(tender.method, tender.amount),
            PaymentStatus::Completed,
            client_id,
            invoice_id,
            tender.method,
            tender.amount,
            received_date,
            tender.reference.clone(),
            transaction_id,
        );
        let payment = self.stores.payments.create(payment).await?;

        self.events.publish(DomainEvent::Billing(BillingEvent::PaymentRecorded {
            payment_id: payment.id,
            client_id,
            invoice_id,
            method: payment.method.to_string(),
            amount: payment.amount,
        }));
        Ok(payment)
    }

    /// Reverse a payment that failed part way: void the approved charges and
    /// mark whatever was already recorded as voided
    async fn undo_payment(&self, client_id: Uuid, approved: &[String], recorded: Vec<Payment>) {
        let voided = self.roll_back(approved).await;
        tracing::warn!(%client_id, charges = voided.len(), recorded = recorded.len(), "payment rolled back");
        for mut payment in recorded {
            payment.set_status(PaymentStatus::Voided);
            match self.stores.payments.save(payment).await {
                Ok(payment) => {
                    self.events.publish(DomainEvent::Billing(BillingEvent::PaymentVoided {
                        payment_id: payment.id,
                        amount: payment.amount,
                    }));
                }
                Err(err) => tracing::error!(%client_id, error = %err, "failed to void recorded payment"),
            }
        }
    }

    /// Void already approved charges; returns the ids that were voided
    async fn roll_back(&self, approved: &[String]) -> Vec<String> {
        let mut voided = Vec::with_capacity(approved.len());
        for transaction_id in approved {
            match self.gateway.void(transaction_id).await {
                Ok(()) => voided.push(transaction_id.clone()),
                Err(err) => {
                    tracing::error!(%transaction_id, error = %err, "failed to void approved charge")
                }
            }
        }
        voided
    }
}

/// Rent stops at the removal day if the device already came out
fn rent_end(client: &Client, through: NaiveDate) -> NaiveDate {
    match client.removed_on {
        Some(removed) => through.min(removed),
        None => through,
    }
}
