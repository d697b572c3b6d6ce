//! Installed customers and their lease terms

use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError};
use crate::core::field::validate_phone;
use crate::core::service::{DataService, fetch_required};
use crate::core::validation::filters;
use crate::core::validation::validators::non_negative_amount;
use crate::core::{Entity, Resource};
use crate::entities::full_name;
use crate::inventory::installed_device;
use crate::scheduling::calendar;
use crate::storage::Stores;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(ClientStatus {
    Pending => "pending",
    Active => "active",
    Removed => "removed",
});

crate::impl_data_entity!(Client, "client", "clients", ClientStatus, ["name", "phone", "email", "driver_license", "status"], {
    first_name: String,
    last_name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    driver_license: Option<String>,
    /// Day the device went into the vehicle; rent accrues from here
    #[serde(default)]
    install_date: Option<NaiveDate>,
    /// Court-ordered monitoring term
    monitoring_days: u32,
    daily_rate: Decimal,
    calibration_interval_days: u32,
    /// `install_date + monitoring_days`, kept in sync on every write
    #[serde(default)]
    removal_date: Option<NaiveDate>,
    /// Rent has been invoiced up to (excluding) this day
    #[serde(default)]
    billed_through: Option<NaiveDate>,
    /// Day the device actually came out; rent stops accruing here
    #[serde(default)]
    removed_on: Option<NaiveDate>,
    #[serde(default)]
    lead_id: Option<Uuid>,
});

impl Client {
    /// Recompute the derived removal date after install or term changes
    pub fn refresh_removal_date(&mut self) {
        self.removal_date = self
            .install_date
            .map(|install| calendar::removal_date(install, self.monitoring_days));
    }

    /// First day of rent that has not been invoiced yet
    pub fn unbilled_from(&self) -> Option<NaiveDate> {
        match (self.install_date, self.billed_through) {
            (Some(install), Some(billed)) => Some(install.max(billed)),
            (install, None) => install,
            (None, Some(_)) => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClient {
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
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
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateClient {
    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
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

#[async_trait]
impl Resource for Client {
    type Create = CreateClient;
    type Update = UpdateClient;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.clients.clone()
    }

    fn from_create(input: CreateClient, config: &AppConfig) -> AppResult<Self> {
        let first_name = filters::trim(&input.first_name);
        let last_name = filters::trim(&input.last_name);
        let status = if input.install_date.is_some() {
            ClientStatus::Active
        } else {
            ClientStatus::Pending
        };
        let mut client = Client::new(
            full_name(&first_name, &last_name),
            status,
            first_name,
            last_name,
            filters::digits_only(&input.phone),
            input.email.as_deref().map(filters::email),
            filters::trim_optional(input.address),
            input.driver_license.as_deref().map(filters::uppercase),
            input.install_date,
            input
                .monitoring_days
                .unwrap_or(config.scheduling.default_monitoring_days),
            input
                .daily_rate
                .unwrap_or(config.billing.default_daily_rate),
            input
                .calibration_interval_days
                .unwrap_or(config.scheduling.default_calibration_interval_days),
            None,
            None,
            None,
            input.lead_id,
        );
        client.refresh_removal_date();
        Ok(client)
    }

    fn apply_update(&mut self, input: UpdateClient, _config: &AppConfig) -> AppResult<()> {
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
        if input.address.is_some() {
            self.address = filters::trim_optional(input.address);
        }
        if let Some(license) = input.driver_license {
            self.driver_license = Some(filters::uppercase(&license));
        }
        if let Some(install_date) = input.install_date {
            self.install_date = Some(install_date);
            if self.status == ClientStatus::Pending {
                self.status = ClientStatus::Active;
            }
        }
        if let Some(days) = input.monitoring_days {
            self.monitoring_days = days;
        }
        if let Some(rate) = input.daily_rate {
            self.daily_rate = rate;
        }
        if let Some(days) = input.calibration_interval_days {
            self.calibration_interval_days = days;
        }
        self.name = full_name(&self.first_name, &self.last_name);
        self.refresh_removal_date();
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        if let Some(lead_id) = self.lead_id {
            fetch_required(stores.leads.as_ref(), lead_id).await?;
        }
        Ok(())
    }

    async fn check_delete(&self, stores: &Stores) -> AppResult<()> {
        match installed_device(stores, "client_id", self.id).await? {
            Some(device) => Err(EntityError::invalid_state(
                "client",
                self.id,
                self.status(),
                format!("device {} is still installed; complete a removal first", device.serial_number),
            )
            .into()),
            None => Ok(()),
        }
    }
}
