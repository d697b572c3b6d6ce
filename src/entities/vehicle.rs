//! Vehicles that carry an interlock device

use crate::config::AppConfig;
use crate::core::{Entity, Resource};
use crate::core::error::{AppResult, EntityError};
use crate::core::field::validate_vin;
use crate::core::service::{DataService, fetch_required, search_live};
use crate::core::validation::filters;
use crate::inventory::installed_device;
use crate::storage::Stores;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(VehicleStatus {
    Active => "active",
    Inactive => "inactive",
});

crate::impl_data_entity!(Vehicle, "vehicle", "vehicles", VehicleStatus, ["name", "vin", "plate", "client_id"], {
    client_id: Uuid,
    make: String,
    model: String,
    year: i32,
    vin: String,
    #[serde(default)]
    plate: Option<String>,
});

fn label(year: i32, make: &str, model: &str) -> String {
    format!("{year} {make} {model}")
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicle {
    pub client_id: Uuid,
    #[validate(length(min = 1, max = 32))]
    pub make: String,
    #[validate(length(min = 1, max = 32))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: i32,
    #[validate(custom(function = "validate_vin"))]
    pub vin: String,
    #[validate(length(min = 1, max = 10))]
    pub plate: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVehicle {
    #[validate(length(min = 1, max = 32))]
    pub make: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub model: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[validate(custom(function = "validate_vin"))]
    pub vin: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub plate: Option<String>,
    pub status: Option<VehicleStatus>,
}

#[async_trait]
impl Resource for Vehicle {
    type Create = CreateVehicle;
    type Update = UpdateVehicle;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.vehicles.clone()
    }

    fn from_create(input: CreateVehicle, _config: &AppConfig) -> AppResult<Self> {
        let make = filters::trim(&input.make);
        let model = filters::trim(&input.model);
        Ok(Vehicle::new(
            label(input.year, &make, &model),
            VehicleStatus::Active,
            input.client_id,
            make,
            model,
            input.year,
            filters::uppercase(&input.vin),
            input.plate.as_deref().map(filters::uppercase),
        ))
    }

    fn apply_update(&mut self, input: UpdateVehicle, _config: &AppConfig) -> AppResult<()> {
        if let Some(make) = input.make {
            self.make = filters::trim(&make);
        }
        if let Some(model) = input.model {
            self.model = filters::trim(&model);
        }
        if let Some(year) = input.year {
            self.year = year;
        }
        if let Some(vin) = input.vin {
            self.vin = filters::uppercase(&vin);
        }
        if let Some(plate) = input.plate {
            self.plate = Some(filters::uppercase(&plate));
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.name = label(self.year, &self.make, &self.model);
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        fetch_required(stores.clients.as_ref(), self.client_id).await?;

        let duplicate = search_live(stores.vehicles.as_ref(), "vin", &self.vin)
            .await?
            .into_iter()
            .find(|other| other.id != self.id);
        if let Some(other) = duplicate {
            return Err(EntityError::AlreadyExists {
                entity_type: "vehicle".to_string(),
                id: other.id,
            }
            .into());
        }
        Ok(())
    }

    async fn check_delete(&self, stores: &Stores) -> AppResult<()> {
        match installed_device(stores, "vehicle_id", self.id).await? {
            Some(device) => Err(EntityError::invalid_state(
                "vehicle",
                self.id,
                self.status(),
                format!("device {} is still installed", device.serial_number),
            )
            .into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_create_normalises_vin_and_plate() {
        let body = CreateVehicle {
            client_id: Uuid::new_v4(),
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: 2016,
            vin: "1hgcm82633a004352".to_string(),
            plate: Some("ab1 23c".to_string()),
        };
        assert!(body.validate().is_ok());

        let vehicle = Vehicle::from_create(body, &AppConfig::default()).unwrap();
        assert_eq!(vehicle.name, "2016 Honda Civic");
        assert_eq!(vehicle.vin, "1HGCM82633A004352");
        assert_eq!(vehicle.plate.as_deref(), Some("AB123C"));
    }

    #[test]
    fn test_vin_with_letter_o_is_rejected() {
        let body = CreateVehicle {
            client_id: Uuid::new_v4(),
            make: "Ford".to_string(),
            model: "F-150".to_string(),
            year: 2019,
            vin: "1FTEW1EP5KFAO0001".to_string(),
            plate: None,
        };
        assert!(body.validate().is_err());
    }
}
