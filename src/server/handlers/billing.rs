//! Balances, invoices and payments

use crate::billing::{AssembledInvoice, BalanceStatement, InvoiceRequest, PaymentReceipt, PaymentRequest, Tender};
use crate::core::error::AppResult;
use crate::core::ValidatedJson;
use crate::core::validation::{Path, Query};
use crate::entities::{Invoice, Payment};
use crate::server::host::ServerHost;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<ServerHost> {
    Router::new()
        .route("/clients/{id}/balance", get(client_balance))
        .route("/invoices/preview", post(preview_invoice))
        .route("/invoices/assemble", post(assemble_invoice))
        .route("/invoices/{id}/payments", post(pay_invoice))
        .route("/appointments/{id}/invoice", post(invoice_appointment))
        .route("/payments/{id}/void", post(void_payment))
}

/// `POST /invoices` assembles
pub fn create_invoice_route() -> MethodRouter<ServerHost> {
    post(assemble_invoice)
}

/// `POST /payments` takes an account payment
pub fn create_payment_route() -> MethodRouter<ServerHost> {
    post(pay_account)
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub as_of: Option<NaiveDate>,
}

/// Payment not tied to an invoice
#[derive(Debug, Deserialize, Validate)]
pub struct AccountPaymentRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, max = 8), nested)]
    pub tenders: Vec<Tender>,
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
}

pub async fn client_balance(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<BalanceStatement>> {
    let as_of = query.as_of.unwrap_or_else(|| host.today());
    Ok(Json(host.billing.balance(id, as_of).await?))
}

pub async fn preview_invoice(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<InvoiceRequest>,
) -> AppResult<Json<AssembledInvoice>> {
    let today = host.today();
    Ok(Json(host.billing.preview(&request, today).await?))
}

pub async fn assemble_invoice(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<InvoiceRequest>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let today = host.today();
    let invoice = host.billing.assemble(request, today).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn invoice_appointment(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let today = host.today();
    let invoice = host.billing.invoice_appointment(id, today).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn pay_invoice(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<PaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentReceipt>)> {
    let today = host.today();
    let receipt = host.billing.pay_invoice(id, request, today).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn pay_account(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<AccountPaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentReceipt>)> {
    let today = host.today();
    let payment = PaymentRequest {
        tenders: request.tenders,
        received_date: request.received_date,
    };
    let receipt = host.billing.pay_account(request.client_id, payment, today).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn void_payment(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Payment>> {
    Ok(Json(host.billing.void_payment(id).await?))
}
