//! Recorded payments, one per tender

use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError};
use crate::core::service::{DataService, fetch_required};
use crate::core::validation::filters;
use crate::core::{Entity, NoInput, Resource};
use crate::storage::Stores;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(PaymentStatus {
    Completed => "completed",
    Voided => "voided",
    Refunded => "refunded",
});

crate::string_enum!(PaymentMethod {
    Cash => "cash",
    Check => "check",
    MoneyOrder => "money_order",
    Card => "card",
});

crate::impl_data_entity!(Payment, "payment", "payments", PaymentStatus, ["name", "client_id", "invoice_id", "method", "received_date", "status"], {
    client_id: Uuid,
    #[serde(default)]
    invoice_id: Option<Uuid>,
    method: PaymentMethod,
    amount: Decimal,
    received_date: NaiveDate,
    /// Check or money order number
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    gateway_transaction_id: Option<String>,
});

impl Payment {
    pub fn label(method: PaymentMethod, amount: Decimal) -> String {
        format!("{method} {amount}")
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePayment {
    #[validate(length(min = 1, max = 64))]
    pub reference: Option<String>,
}

#[async_trait]
impl Resource for Payment {
    type Create = NoInput;
    type Update = UpdatePayment;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.payments.clone()
    }

    fn from_create(input: NoInput, _config: &AppConfig) -> AppResult<Self> {
        match input {}
    }

    fn apply_update(&mut self, input: UpdatePayment, _config: &AppConfig) -> AppResult<()> {
        if input.reference.is_some() {
            self.reference = filters::trim_optional(input.reference);
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        fetch_required(stores.clients.as_ref(), self.client_id).await?;
        Ok(())
    }

    async fn check_delete(&self, _stores: &Stores) -> AppResult<()> {
        if self.is_completed() {
            return Err(EntityError::invalid_state(
                "payment",
                self.id,
                self.status(),
                "void the payment before deleting it",
            )
            .into());
        }
        Ok(())
    }
}
