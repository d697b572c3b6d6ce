//! Billing: rent proration, invoice assembly, balances and payments
//!
//! The submodules other than [`service`] are pure functions over entity
//! values. [`service::BillingService`] loads records, calls them and writes
//! the results back.

pub mod balance;
pub mod invoice;
pub mod money;
pub mod rates;
pub mod reconcile;
pub mod service;

pub use balance::{BalanceStatement, balance};
pub use invoice::{AssembledInvoice, InvoiceAssembler, InvoiceLine, InvoiceTotals, LineKind, invoice_number};
pub use money::{round_cents, tax};
pub use rates::{four_week_rent, prorated_rent, rental_periods};
pub use reconcile::{Tender, TenderPlan, plan_tenders};
pub use service::{BillingService, InvoiceRequest, PaymentReceipt, PaymentRequest};
