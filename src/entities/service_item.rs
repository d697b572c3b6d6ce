//! Billable service catalog (installs, calibrations, removals, fees)

use crate::config::AppConfig;
use crate::core::Resource;
use crate::core::error::{AppResult, EntityError};
use crate::core::service::{DataService, search_live};
use crate::core::validation::filters;
use crate::core::validation::validators::{non_negative_amount, service_code};
use crate::storage::Stores;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

crate::string_enum!(ServiceItemStatus {
    Active => "active",
    Inactive => "inactive",
});

crate::string_enum!(ServiceKind {
    Install => "install",
    Calibration => "calibration",
    Removal => "removal",
    Lockout => "lockout",
    Fee => "fee",
});

crate::impl_data_entity!(ServiceItem, "service", "services", ServiceItemStatus, ["name", "code", "kind", "status"], {
    /// Catalog code referenced by appointments and invoice requests
    code: String,
    description: String,
    price: Decimal,
    taxable: bool,
    kind: ServiceKind,
});

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceItem {
    #[validate(custom(function = "service_code"))]
    pub code: String,
    #[validate(length(min = 1, max = 128))]
    pub description: String,
    #[validate(custom(function = "non_negative_amount"))]
    pub price: Decimal,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
    pub kind: ServiceKind,
}

fn default_taxable() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateServiceItem {
    #[validate(length(min = 1, max = 128))]
    pub description: Option<String>,
    #[validate(custom(function = "non_negative_amount"))]
    pub price: Option<Decimal>,
    pub taxable: Option<bool>,
    pub kind: Option<ServiceKind>,
    pub status: Option<ServiceItemStatus>,
}

#[async_trait]
impl Resource for ServiceItem {
    type Create = CreateServiceItem;
    type Update = UpdateServiceItem;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.services.clone()
    }

    fn from_create(input: CreateServiceItem, _config: &AppConfig) -> AppResult<Self> {
        let code = filters::uppercase(&input.code);
        Ok(ServiceItem::new(
            code.clone(),
            ServiceItemStatus::Active,
            code,
            filters::trim(&input.description),
            input.price,
            input.taxable,
            input.kind,
        ))
    }

    fn apply_update(&mut self, input: UpdateServiceItem, _config: &AppConfig) -> AppResult<()> {
        if let Some(description) = input.description {
            self.description = filters::trim(&description);
        }
        if let Some(price) = input.price {
            self.price = price;
        }
        if let Some(taxable) = input.taxable {
            self.taxable = taxable;
        }
        if let Some(kind) = input.kind {
            self.kind = kind;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        let duplicate = search_live(stores.services.as_ref(), "code", &self.code)
            .await?
            .into_iter()
            .find(|other| other.id != self.id);
        match duplicate {
            Some(other) => Err(EntityError::AlreadyExists {
                entity_type: "service".to_string(),
                id: other.id,
            }
            .into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_uppercased_and_taxable_by_default() {
        let body: CreateServiceItem = serde_json::from_value(serde_json::json!({
            "code": "cal",
            "description": "Calibration visit",
            "price": "45.00",
            "kind": "calibration"
        }))
        .unwrap();
        assert!(body.validate().is_ok());

        let item = ServiceItem::from_create(body, &AppConfig::default()).unwrap();
        assert_eq!(item.code, "CAL");
        assert!(item.taxable);
        assert_eq!(item.price, Decimal::new(4500, 2));
    }

    #[test]
    fn test_price_with_fractional_cents_is_rejected() {
        let body = CreateServiceItem {
            code: "LOCK".to_string(),
            description: "Lockout reset".to_string(),
            price: Decimal::new(12345, 3),
            taxable: true,
            kind: ServiceKind::Lockout,
        };
        assert!(body.validate().is_err());
    }
}
