//! Card payment gateway abstraction
//!
//! Card data never reaches this service: the browser exchanges it for a
//! token, and the gateway charges the token. Implementations translate
//! [`ChargeRequest`] into their own wire format.

pub mod sandbox;

pub use sandbox::SandboxGateway;

use crate::config::{GatewayConfig, GatewayMode};
use crate::core::error::PaymentError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub client_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    pub token: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChargeOutcome {
    Approved {
        transaction_id: String,
        auth_code: String,
    },
    Declined {
        reason: String,
    },
}

/// A card processor.
///
/// `Err` means the gateway could not be reached or answered garbage; a
/// refused card is a successful call returning [`ChargeOutcome::Declined`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError>;

    /// Reverse an approved charge
    async fn void(&self, transaction_id: &str) -> Result<(), PaymentError>;
}

/// Build the gateway selected in configuration
pub fn from_config(config: &GatewayConfig) -> Arc<dyn PaymentGateway> {
    match config.mode {
        GatewayMode::Sandbox => Arc::new(SandboxGateway::new(config.decline_over)),
    }
}
