//! Interlock units held in inventory or installed in a vehicle
//!
//! Status changes go through [`InventoryService`](crate::inventory::InventoryService);
//! the generic update only touches descriptive fields.

use crate::config::AppConfig;
use crate::core::{Entity, Resource};
use crate::core::error::{AppResult, EntityError};
use crate::core::service::{DataService, search_live};
use crate::core::validation::filters;
use crate::storage::Stores;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(DeviceStatus {
    InStock => "in_stock",
    Installed => "installed",
    Maintenance => "maintenance",
    Retired => "retired",
});

crate::impl_data_entity!(Device, "device", "devices", DeviceStatus, ["name", "serial_number", "vehicle_id", "client_id", "status"], {
    serial_number: String,
    model: String,
    #[serde(default)]
    vehicle_id: Option<Uuid>,
    #[serde(default)]
    client_id: Option<Uuid>,
    #[serde(default)]
    last_calibrated: Option<NaiveDate>,
    #[serde(default)]
    installed_on: Option<NaiveDate>,
    #[serde(default)]
    notes: Option<String>,
});

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDevice {
    #[validate(length(min = 3, max = 32))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 64))]
    pub model: String,
    pub last_calibrated: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDevice {
    #[validate(length(min = 1, max = 64))]
    pub model: Option<String>,
    pub last_calibrated: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[async_trait]
impl Resource for Device {
    type Create = CreateDevice;
    type Update = UpdateDevice;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.devices.clone()
    }

    fn from_create(input: CreateDevice, _config: &AppConfig) -> AppResult<Self> {
        let serial = filters::uppercase(&input.serial_number);
        Ok(Device::new(
            serial.clone(),
            DeviceStatus::InStock,
            serial,
            filters::trim(&input.model),
            None,
            None,
            input.last_calibrated,
            None,
            filters::trim_optional(input.notes),
        ))
    }

    fn apply_update(&mut self, input: UpdateDevice, _config: &AppConfig) -> AppResult<()> {
        if let Some(model) = input.model {
            self.model = filters::trim(&model);
        }
        if let Some(date) = input.last_calibrated {
            self.last_calibrated = Some(date);
        }
        if input.notes.is_some() {
            self.notes = filters::trim_optional(input.notes);
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        let duplicate = search_live(stores.devices.as_ref(), "serial_number", &self.serial_number)
            .await?
            .into_iter()
            .find(|other| other.id != self.id);
        match duplicate {
            Some(other) => Err(EntityError::AlreadyExists {
                entity_type: "device".to_string(),
                id: other.id,
            }
            .into()),
            None => Ok(()),
        }
    }

    async fn check_delete(&self, _stores: &Stores) -> AppResult<()> {
        match self.status {
            DeviceStatus::InStock | DeviceStatus::Retired => Ok(()),
            _ => Err(EntityError::invalid_state(
                "device",
                self.id,
                self.status(),
                "only stocked or retired devices can be deleted",
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_devices_start_in_stock() {
        let body = CreateDevice {
            serial_number: "iid-10442".to_string(),
            model: "LifeSafer FC100".to_string(),
            last_calibrated: None,
            notes: Some("  ".to_string()),
        };
        let device = Device::from_create(body, &AppConfig::default()).unwrap();
        assert_eq!(device.status, DeviceStatus::InStock);
        assert_eq!(device.serial_number, "IID-10442");
        assert_eq!(device.name, "IID-10442");
        assert_eq!(device.notes, None);
    }

    #[tokio::test]
    async fn test_only_stocked_or_retired_devices_can_be_deleted() {
        let stores = Stores::in_memory();
        let body = CreateDevice {
            serial_number: "IID-20001".to_string(),
            model: "LifeSafer FC100".to_string(),
            last_calibrated: None,
            notes: None,
        };
        let mut device = Device::from_create(body, &AppConfig::default()).unwrap();
        assert!(device.check_delete(&stores).await.is_ok());

        for status in [DeviceStatus::Installed, DeviceStatus::Maintenance] {
            device.set_status(status);
            let err = device.check_delete(&stores).await.unwrap_err();
            assert_eq!(err.error_code(), "ENTITY_INVALID_STATE");
        }

        device.set_status(DeviceStatus::Retired);
        assert!(device.check_delete(&stores).await.is_ok());
    }
}
