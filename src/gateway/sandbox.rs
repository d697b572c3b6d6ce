//! Deterministic in-process gateway for development and tests
//!
//! | Token / amount                  | Result                    |
//! |---------------------------------|---------------------------|
//! | starts with `tok_decline`       | declined                  |
//! | `tok_error`                     | `PaymentError::Gateway`   |
//! | amount above `decline_over`     | declined                  |
//! | anything else                   | approved, `txn_<uuid>`    |

use super::{ChargeOutcome, ChargeRequest, PaymentGateway};
use crate::core::error::PaymentError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStatus {
    Approved,
    Declined,
    Voided,
}

/// A charge attempt seen by the sandbox
#[derive(Debug, Clone, Serialize)]
pub struct SandboxTransaction {
    pub transaction_id: Option<String>,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub token: String,
    pub status: SandboxStatus,
}

#[derive(Clone, Default)]
pub struct SandboxGateway {
    decline_over: Option<Decimal>,
    transactions: Arc<RwLock<Vec<SandboxTransaction>>>,
}

impl SandboxGateway {
    pub fn new(decline_over: Option<Decimal>) -> Self {
        Self {
            decline_over,
            transactions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of every charge attempt, oldest first
    pub fn transactions(&self) -> Vec<SandboxTransaction> {
        self.transactions
            .read()
            .map(|txns| txns.clone())
            .unwrap_or_default()
    }

    fn record(&self, txn: SandboxTransaction) -> Result<(), PaymentError> {
        self.transactions
            .write()
            .map_err(|e| PaymentError::Gateway(format!("sandbox ledger poisoned: {e}")))?
            .push(txn);
        Ok(())
    }

    fn decline_reason(&self, request: &ChargeRequest) -> Option<String> {
        if request.token.starts_with("tok_decline") {
            return Some("card declined by issuer".to_string());
        }
        match self.decline_over {
            Some(limit) if request.amount > limit => {
                Some(format!("amount exceeds sandbox limit of {limit}"))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    fn name(&self) -> &str {
        "sandbox"
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        if request.token == "tok_error" {
            return Err(PaymentError::Gateway("sandbox gateway unavailable".to_string()));
        }

        let (outcome, status, transaction_id) = match self.decline_reason(request) {
            Some(reason) => (ChargeOutcome::Declined { reason }, SandboxStatus::Declined, None),
            None => {
                let transaction_id = format!("txn_{}", Uuid::new_v4().simple());
                let auth_code = transaction_id[4..10].to_uppercase();
                (
                    ChargeOutcome::Approved {
                        transaction_id: transaction_id.clone(),
                        auth_code,
                    },
                    SandboxStatus::Approved,
                    Some(transaction_id),
                )
            }
        };

        self.record(SandboxTransaction {
            transaction_id,
            client_id: request.client_id,
            amount: request.amount,
            token: request.token.clone(),
            status,
        })?;

        tracing::debug!(amount = %request.amount, ?status, "sandbox charge");
        Ok(outcome)
    }

    async fn void(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let mut txns = self
            .transactions
            .write()
            .map_err(|e| PaymentError::Gateway(format!("sandbox ledger poisoned: {e}")))?;

        let txn = txns
            .iter_mut()
            .find(|t| t.transaction_id.as_deref() == Some(transaction_id))
            .ok_or_else(|| PaymentError::Gateway(format!("unknown transaction {transaction_id}")))?;

        match txn.status {
            SandboxStatus::Approved | SandboxStatus::Voided => {
                txn.status = SandboxStatus::Voided;
                Ok(())
            }
            SandboxStatus::Declined => Err(PaymentError::Gateway(format!(
                "transaction {transaction_id} was declined and cannot be voided"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(token: &str, cents: i64) -> ChargeRequest {
        ChargeRequest {
            client_id: Uuid::new_v4(),
            invoice_id: None,
            amount: Decimal::new(cents, 2),
            token: token.to_string(),
            description: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_approves_and_records() {
        let gateway = SandboxGateway::new(None);
        let outcome = gateway.charge(&request("tok_visa", 10449)).await.unwrap();
        let ChargeOutcome::Approved { transaction_id, auth_code } = outcome else {
            panic!("expected approval");
        };
        assert!(transaction_id.starts_with("txn_"));
        assert_eq!(auth_code.len(), 6);
        assert_eq!(gateway.transactions().len(), 1);
        assert_eq!(gateway.transactions()[0].status, SandboxStatus::Approved);
    }

    #[tokio::test]
    async fn test_decline_rules() {
        let gateway = SandboxGateway::new(Some(Decimal::new(50000, 2)));
        assert!(matches!(
            gateway.charge(&request("tok_decline_insufficient", 100)).await.unwrap(),
            ChargeOutcome::Declined { .. }
        ));
        assert!(matches!(
            gateway.charge(&request("tok_visa", 50001)).await.unwrap(),
            ChargeOutcome::Declined { .. }
        ));
        assert!(matches!(
            gateway.charge(&request("tok_visa", 50000)).await.unwrap(),
            ChargeOutcome::Approved { .. }
        ));
    }

    #[tokio::test]
    async fn test_error_token_fails_without_recording() {
        let gateway = SandboxGateway::new(None);
        let err = gateway.charge(&request("tok_error", 100)).await.unwrap_err();
        assert!(matches!(err, PaymentError::Gateway(_)));
        assert!(gateway.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_void() {
        let gateway = SandboxGateway::new(None);
        let ChargeOutcome::Approved { transaction_id, .. } =
            gateway.charge(&request("tok_visa", 2000)).await.unwrap()
        else {
            panic!("expected approval");
        };
        gateway.void(&transaction_id).await.unwrap();
        assert_eq!(gateway.transactions()[0].status, SandboxStatus::Voided);
        assert!(gateway.void("txn_missing").await.is_err());
    }
}
