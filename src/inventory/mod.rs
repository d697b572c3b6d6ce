//! Device inventory and custody
//!
//! ```text
//! in_stock ──assign──▶ installed ──release──▶ in_stock
//! in_stock ◀────────▶ maintenance
//! in_stock | maintenance ──▶ retired
//! ```
//!
//! A device sits in at most one vehicle and a vehicle holds at most one
//! installed device.

use crate::core::error::{AppResult, EntityError, InventoryError, ValidationError};
use crate::core::events::{DomainEvent, EventBus, InventoryEvent};
use crate::core::service::{WriteGuard, fetch_required, search_live};
use crate::core::Entity;
use crate::entities::device::{Device, DeviceStatus};
use crate::storage::Stores;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// Whether the lifecycle allows `from → to`
pub fn can_transition(from: DeviceStatus, to: DeviceStatus) -> bool {
    use DeviceStatus::*;
    matches!(
        (from, to),
        (InStock, Installed)
            | (Installed, InStock)
            | (InStock, Maintenance)
            | (Maintenance, InStock)
            | (InStock, Retired)
            | (Maintenance, Retired)
    )
}

fn check_transition(device: &Device, to: DeviceStatus) -> Result<(), InventoryError> {
    if can_transition(device.status, to) {
        Ok(())
    } else {
        Err(InventoryError::IllegalTransition {
            device_id: device.id,
            from: device.status.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignRequest {
    pub vehicle_id: Uuid,
    #[serde(default)]
    pub installed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransitionRequest {
    pub status: DeviceStatus,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Device counts per status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

pub struct InventoryService {
    stores: Stores,
    events: EventBus,
}

impl InventoryService {
    pub fn new(stores: Stores, events: EventBus) -> Self {
        Self {
            stores,
            events,
        }
    }

    /// Move a device between stock, maintenance and retirement.
    ///
    /// Installing and releasing carry a vehicle, so they go through
    /// [`assign`](Self::assign) and [`release`](Self::release).
    pub async fn transition(&self, device_id: Uuid, request: TransitionRequest) -> AppResult<Device> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut device = fetch_required(self.stores.devices.as_ref(), device_id).await?;
        check_transition(&device, request.status)?;
        if device.status == DeviceStatus::Installed || request.status == DeviceStatus::Installed {
            return Err(EntityError::invalid_state(
                "device",
                device.id,
                device.status(),
                "use assign or release to change an installation",
            )
            .into());
        }

        let from = device.status;
        device.set_status(request.status);
        if let Some(notes) = request.notes.filter(|n| !n.trim().is_empty()) {
            device.notes = Some(notes.trim().to_string());
        }
        let device = self.stores.devices.save(device).await?;

        tracing::info!(device_id = %device.id, %from, to = %device.status, "device status changed");
        self.events.publish(DomainEvent::Inventory(InventoryEvent::StatusChanged {
            device_id: device.id,
            from: from.to_string(),
            to: device.status.to_string(),
        }));
        Ok(device)
    }

    /// Install a stocked device in a vehicle
    pub async fn assign(&self, device_id: Uuid, vehicle_id: Uuid, installed_on: NaiveDate) -> AppResult<Device> {
        let guard = self.stores.write_lock.acquire().await;
        self.assign_held(&guard, device_id, vehicle_id, installed_on).await
    }

    pub(crate) async fn assign_held(
        &self,
        _held: &WriteGuard<'_>,
        device_id: Uuid,
        vehicle_id: Uuid,
        installed_on: NaiveDate,
    ) -> AppResult<Device> {
        let mut device = fetch_required(self.stores.devices.as_ref(), device_id).await?;
        let vehicle = fetch_required(self.stores.vehicles.as_ref(), vehicle_id).await?;
        check_transition(&device, DeviceStatus::Installed)?;

        if let Some(occupant) = self.installed_in_vehicle(vehicle.id).await? {
            return Err(InventoryError::VehicleOccupied {
                vehicle_id: vehicle.id,
                device_id: occupant.id,
            }
            .into());
        }

        device.vehicle_id = Some(vehicle.id);
        device.client_id = Some(vehicle.client_id);
        device.installed_on = Some(installed_on);
        device.set_status(DeviceStatus::Installed);
        let device = self.stores.devices.save(device).await?;

        tracing::info!(device_id = %device.id, vehicle_id = %vehicle.id, "device assigned");
        self.events.publish(DomainEvent::Inventory(InventoryEvent::DeviceAssigned {
            device_id: device.id,
            vehicle_id: vehicle.id,
            client_id: vehicle.client_id,
        }));
        Ok(device)
    }

    /// Take an installed device back into stock
    pub async fn release(&self, device_id: Uuid) -> AppResult<Device> {
        let guard = self.stores.write_lock.acquire().await;
        self.release_held(&guard, device_id).await
    }

    pub(crate) async fn release_held(&self, _held: &WriteGuard<'_>, device_id: Uuid) -> AppResult<Device> {
        let mut device = fetch_required(self.stores.devices.as_ref(), device_id).await?;
        if device.status != DeviceStatus::Installed {
            return Err(InventoryError::IllegalTransition {
                device_id: device.id,
                from: device.status.to_string(),
                to: DeviceStatus::InStock.to_string(),
            }
            .into());
        }

        let vehicle_id = device.vehicle_id.take();
        device.client_id = None;
        device.installed_on = None;
        device.set_status(DeviceStatus::InStock);
        let device = self.stores.devices.save(device).await?;

        tracing::info!(device_id = %device.id, ?vehicle_id, "device released");
        self.events.publish(DomainEvent::Inventory(InventoryEvent::DeviceReleased {
            device_id: device.id,
            vehicle_id,
        }));
        Ok(device)
    }

    /// Stamp a calibration on an installed device
    pub async fn record_calibration(&self, device_id: Uuid, on: NaiveDate) -> AppResult<Device> {
        let guard = self.stores.write_lock.acquire().await;
        self.record_calibration_held(&guard, device_id, on).await
    }

    pub(crate) async fn record_calibration_held(
        &self,
        _held: &WriteGuard<'_>,
        device_id: Uuid,
        on: NaiveDate,
    ) -> AppResult<Device> {
        let mut device = fetch_required(self.stores.devices.as_ref(), device_id).await?;
        if device.status != DeviceStatus::Installed {
            return Err(EntityError::invalid_state(
                "device",
                device.id,
                device.status(),
                "only installed devices are calibrated in the field",
            )
            .into());
        }
        device.last_calibrated = Some(on);
        device.touch();
        Ok(self.stores.devices.save(device).await?)
    }

    pub async fn installed_in_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<Device>> {
        installed_device(&self.stores, "vehicle_id", vehicle_id).await
    }

    pub async fn installed_for_client(&self, client_id: Uuid) -> AppResult<Option<Device>> {
        installed_device(&self.stores, "client_id", client_id).await
    }

    /// Oldest device currently in stock
    pub async fn next_in_stock(&self) -> AppResult<Device> {
        search_live(self.stores.devices.as_ref(), "status", DeviceStatus::InStock.as_str())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::NoStock.into())
    }

    pub async fn stock_summary(&self) -> AppResult<StockSummary> {
        let mut by_status: BTreeMap<String, usize> = DeviceStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        let devices: Vec<Device> = self
            .stores
            .devices
            .list()
            .await?
            .into_iter()
            .filter(|d| !d.is_deleted())
            .collect();
        for device in &devices {
            *by_status.entry(device.status.to_string()).or_default() += 1;
        }
        Ok(StockSummary {
            total: devices.len(),
            by_status,
        })
    }
}

/// The installed device whose `field` (`vehicle_id` or `client_id`) is `id`
pub(crate) async fn installed_device(stores: &Stores, field: &str, id: Uuid) -> AppResult<Option<Device>> {
    Ok(search_live(stores.devices.as_ref(), field, &id.to_string())
        .await?
        .into_iter()
        .find(|d| d.status == DeviceStatus::Installed))
}

/// Device work needs a vehicle to put the device in or take it out of
pub(crate) fn require_vehicle(vehicle_id: Option<Uuid>) -> AppResult<Uuid> {
    vehicle_id.ok_or_else(|| ValidationError::field("vehicle_id", "a vehicle is required").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::vehicle::{Vehicle, VehicleStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (Stores, InventoryService, Device, Vehicle) {
        let stores = Stores::in_memory();
        let service = InventoryService::new(stores.clone(), EventBus::new(16));
        let device = Device::new(
            "IID-0001".to_string(),
            DeviceStatus::InStock,
            "IID-0001".to_string(),
            "Guardian WR3".to_string(),
            None,
            None,
            None,
            None,
            None,
        );
        let device = stores.devices.create(device).await.unwrap();
        let vehicle = Vehicle::new(
            "2019 Honda Civic".to_string(),
            VehicleStatus::Active,
            Uuid::new_v4(),
            "Honda".to_string(),
            "Civic".to_string(),
            2019,
            "2HGFC2F59KH512345".to_string(),
            None,
        );
        let vehicle = stores.vehicles.create(vehicle).await.unwrap();
        (stores, service, device, vehicle)
    }

    #[test]
    fn test_lifecycle_edges() {
        use DeviceStatus::*;
        assert!(can_transition(InStock, Installed));
        assert!(can_transition(Maintenance, Retired));
        assert!(!can_transition(Installed, Retired));
        assert!(!can_transition(Retired, InStock));
        assert!(!can_transition(Installed, Maintenance));
    }

    #[tokio::test]
    async fn test_assign_and_release() {
        let (_stores, service, device, vehicle) = setup().await;

        let installed = service.assign(device.id, vehicle.id, date(2024, 3, 1)).await.unwrap();
        assert_eq!(installed.status, DeviceStatus::Installed);
        assert_eq!(installed.client_id, Some(vehicle.client_id));

        // assigned device cannot go to a second vehicle
        let err = service.assign(device.id, vehicle.id, date(2024, 3, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::core::AppError::Inventory(InventoryError::IllegalTransition { .. })
        ));

        let released = service.release(device.id).await.unwrap();
        assert_eq!(released.status, DeviceStatus::InStock);
        assert_eq!(released.vehicle_id, None);
    }

    #[tokio::test]
    async fn test_vehicle_holds_one_device() {
        let (stores, service, device, vehicle) = setup().await;
        let second = Device::new(
            "IID-0002".to_string(),
            DeviceStatus::InStock,
            "IID-0002".to_string(),
            "Guardian WR3".to_string(),
            None,
            None,
            None,
            None,
            None,
        );
        let second = stores.devices.create(second).await.unwrap();

        service.assign(device.id, vehicle.id, date(2024, 3, 1)).await.unwrap();
        let err = service.assign(second.id, vehicle.id, date(2024, 3, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::core::AppError::Inventory(InventoryError::VehicleOccupied { .. })
        ));
    }

    #[tokio::test]
    async fn test_transition_and_summary() {
        let (_stores, service, device, _vehicle) = setup().await;
        let request = |status| TransitionRequest { status, notes: None };

        service.transition(device.id, request(DeviceStatus::Maintenance)).await.unwrap();
        assert!(service.transition(device.id, request(DeviceStatus::Installed)).await.is_err());
        service.transition(device.id, request(DeviceStatus::Retired)).await.unwrap();
        assert!(service.transition(device.id, request(DeviceStatus::InStock)).await.is_err());

        let summary = service.stock_summary().await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.by_status["retired"], 1);
        assert_eq!(summary.by_status["in_stock"], 0);
        assert!(matches!(
            service.next_in_stock().await.unwrap_err(),
            crate::core::AppError::Inventory(InventoryError::NoStock)
        ));
    }
}
