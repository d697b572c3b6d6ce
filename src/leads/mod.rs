//! Turning leads into clients

use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError, ValidationError};
use crate::core::events::{DomainEvent, EntityEvent, EventBus};
use crate::core::service::fetch_required;
use crate::core::validation::validators::non_negative_amount;
use crate::core::{Entity, Resource};
use crate::entities::client::{Client, CreateClient};
use crate::entities::lead::LeadStatus;
use crate::storage::Stores;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Client details the lead did not carry; rate and terms fall back to config
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ConvertRequest {
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub driver_license: Option<String>,
    pub install_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 3650))]
    pub monitoring_days: Option<u32>,
    #[validate(custom(function = "non_negative_amount"))]
    pub daily_rate: Option<Decimal>,
    #[validate(range(min = 1, max = 365))]
    pub calibration_interval_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub lead_id: Uuid,
    pub client: Client,
}

pub struct LeadService {
    stores: Stores,
    config: Arc<AppConfig>,
    events: EventBus,
}

impl LeadService {
    pub fn new(stores: Stores, config: Arc<AppConfig>, events: EventBus) -> Self {
        Self {
            stores,
            config,
            events,
        }
    }

    /// Create a client from the lead's contact data and mark the lead converted
    pub async fn convert(&self, lead_id: Uuid, overrides: ConvertRequest) -> AppResult<Conversion> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut lead = fetch_required(self.stores.leads.as_ref(), lead_id).await?;
        if lead.status == LeadStatus::Converted {
            return Err(EntityError::invalid_state(
                "lead",
                lead.id,
                lead.status(),
                "lead has already been converted",
            )
            .into());
        }

        let input = CreateClient {
            first_name: lead.first_name.clone(),
            last_name: lead.last_name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            address: overrides.address,
            driver_license: overrides.driver_license,
            install_date: overrides.install_date,
            monitoring_days: overrides.monitoring_days,
            daily_rate: overrides.daily_rate,
            calibration_interval_days: overrides.calibration_interval_days,
            lead_id: Some(lead.id),
        };
        input.validate().map_err(ValidationError::from)?;

        let client = Client::from_create(input, &self.config)?;
        client.check_references(&self.stores).await?;
        let client = self.stores.clients.create(client).await?;

        lead.converted_client_id = Some(client.id);
        lead.set_status(LeadStatus::Converted);
        let lead = self.stores.leads.save(lead).await?;

        tracing::info!(lead_id = %lead.id, client_id = %client.id, "lead converted");
        self.events.publish(DomainEvent::Entity(EntityEvent::Created {
            entity_type: "client".to_string(),
            entity_id: client.id,
        }));
        self.events.publish(DomainEvent::Entity(EntityEvent::Updated {
            entity_type: "lead".to_string(),
            entity_id: lead.id,
        }));

        Ok(Conversion {
            lead_id: lead.id,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::client::ClientStatus;
    use crate::entities::lead::Lead;

    async fn setup() -> (Stores, LeadService, Lead) {
        let stores = Stores::in_memory();
        let service = LeadService::new(stores.clone(), Arc::new(AppConfig::default()), EventBus::new(8));
        let lead = Lead::new(
            "Dana Reyes".to_string(),
            LeadStatus::Contacted,
            "Dana".to_string(),
            "Reyes".to_string(),
            "6095550199".to_string(),
            Some("dana@example.com".to_string()),
            Some("court".to_string()),
            None,
            None,
        );
        let lead = stores.leads.create(lead).await.unwrap();
        (stores, service, lead)
    }

    #[tokio::test]
    async fn test_convert_copies_contact_data_and_marks_lead() {
        let (stores, service, lead) = setup().await;
        let conversion = service
            .convert(
                lead.id,
                ConvertRequest {
                    daily_rate: Some(Decimal::new(400, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let client = conversion.client;
        assert_eq!(client.name, "Dana Reyes");
        assert_eq!(client.phone, "6095550199");
        assert_eq!(client.daily_rate, Decimal::new(400, 2));
        assert_eq!(client.monitoring_days, 365);
        assert_eq!(client.status, ClientStatus::Pending);
        assert_eq!(client.lead_id, Some(lead.id));

        let stored = stores.leads.get(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::Converted);
        assert_eq!(stored.converted_client_id, Some(client.id));
    }

    #[tokio::test]
    async fn test_convert_twice_is_rejected() {
        let (stores, service, lead) = setup().await;
        service.convert(lead.id, ConvertRequest::default()).await.unwrap();
        let err = service.convert(lead.id, ConvertRequest::default()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::core::AppError::Entity(EntityError::InvalidState { .. })
        ));
        assert_eq!(stores.clients.list().await.unwrap().len(), 1);
    }
}
