//! Prospective customers captured before installation

use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError};
use crate::core::field::validate_phone;
use crate::core::service::DataService;
use crate::core::validation::filters;
use crate::core::{Entity, Resource};
use crate::entities::full_name;
use crate::storage::Stores;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(LeadStatus {
    New => "new",
    Contacted => "contacted",
    Converted => "converted",
    Lost => "lost",
});

crate::impl_data_entity!(Lead, "lead", "leads", LeadStatus, ["name", "phone", "email", "status"], {
    first_name: String,
    last_name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    /// Referral channel (court, attorney, web, ...)
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    /// Set once the lead has been turned into a client
    #[serde(default)]
    converted_client_id: Option<Uuid>,
});

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLead {
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLead {
    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
}

impl Resource for Lead {
    type Create = CreateLead;
    type Update = UpdateLead;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.leads.clone()
    }

    fn from_create(input: CreateLead, _config: &AppConfig) -> AppResult<Self> {
        let first_name = filters::trim(&input.first_name);
        let last_name = filters::trim(&input.last_name);
        Ok(Lead::new(
            full_name(&first_name, &last_name),
            LeadStatus::New,
            first_name,
            last_name,
            filters::digits_only(&input.phone),
            input.email.as_deref().map(filters::email),
            filters::trim_optional(input.source),
            filters::trim_optional(input.notes),
            None,
        ))
    }

    fn apply_update(&mut self, input: UpdateLead, _config: &AppConfig) -> AppResult<()> {
        if let Some(status) = input.status {
            if status == LeadStatus::Converted || self.status == LeadStatus::Converted {
                return Err(EntityError::invalid_state(
                    "lead",
                    self.id,
                    self.status(),
                    "conversion status only changes through /leads/{id}/convert",
                )
                .into());
            }
            self.status = status;
        }
        if let Some(first_name) = input.first_name {
            self.first_name = filters::trim(&first_name);
        }
        if let Some(last_name) = input.last_name {
            self.last_name = filters::trim(&last_name);
        }
        if let Some(phone) = input.phone {
            self.phone = filters::digits_only(&phone);
        }
        if let Some(email) = input.email {
            self.email = Some(filters::email(&email));
        }
        if input.source.is_some() {
            self.source = filters::trim_optional(input.source);
        }
        if input.notes.is_some() {
            self.notes = filters::trim_optional(input.notes);
        }
        self.name = full_name(&self.first_name, &self.last_name);
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_body() -> CreateLead {
        CreateLead {
            first_name: " Dana ".to_string(),
            last_name: "Reyes".to_string(),
            phone: "(609) 555-0199".to_string(),
            email: Some("Dana@Example.com".to_string()),
            source: Some("court".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_from_create_normalises_contact_data() {
        let lead = Lead::from_create(create_body(), &AppConfig::default()).unwrap();
        assert_eq!(lead.name, "Dana Reyes");
        assert_eq!(lead.phone, "6095550199");
        assert_eq!(lead.email.as_deref(), Some("dana@example.com"));
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_create_body_rejects_bad_phone() {
        let mut body = create_body();
        body.phone = "12345".to_string();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_update_cannot_mark_converted() {
        let mut lead = Lead::from_create(create_body(), &AppConfig::default()).unwrap();
        let update = UpdateLead {
            status: Some(LeadStatus::Converted),
            ..Default::default()
        };
        assert!(lead.apply_update(update, &AppConfig::default()).is_err());

        let update = UpdateLead {
            status: Some(LeadStatus::Contacted),
            last_name: Some("Reyes-Cruz".to_string()),
            ..Default::default()
        };
        lead.apply_update(update, &AppConfig::default()).unwrap();
        assert_eq!(lead.status, LeadStatus::Contacted);
        assert_eq!(lead.name, "Dana Reyes-Cruz");
    }
}
