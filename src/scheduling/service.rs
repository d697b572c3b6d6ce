//! Scheduling operations over stored appointments

use super::calendar::{self, AppointmentWindow, DateRange, WindowInputs};
use crate::config::AppConfig;
use crate::core::error::{AppResult, BillingError, EntityError, SchedulingError, ValidationError};
use crate::core::service::fetch_required;
use crate::core::validation::filters;
use crate::core::Entity;
use crate::entities::appointment::{Appointment, AppointmentKind, AppointmentStatus};
use crate::entities::client::{Client, ClientStatus};
use crate::entities::service_item::ServiceItemStatus;
use crate::entities::user::UserStatus;
use crate::inventory::{InventoryService, require_vehicle};
use crate::storage::Stores;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /appointments/schedule`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScheduleRequest {
    pub client_id: Uuid,
    #[serde(default)]
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub technician_id: Option<Uuid>,
    pub kind: AppointmentKind,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    #[validate(range(min = 15, max = 480))]
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub service_codes: Vec<String>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    #[validate(range(min = 15, max = 480))]
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub technician_id: Option<Uuid>,
    /// Replace the codes that will be billed
    #[serde(default)]
    pub service_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelRequest {
    /// Record a no-show instead of a cancellation
    #[serde(default)]
    pub no_show: bool,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CompleteRequest {
    /// Device installed during an install visit; defaults to the oldest in stock
    #[serde(default)]
    pub device_id: Option<Uuid>,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
    /// Replace the codes that will be billed
    #[serde(default)]
    pub service_codes: Option<Vec<String>>,
}

pub struct SchedulingService {
    stores: Stores,
    config: Arc<AppConfig>,
    inventory: Arc<InventoryService>,
}

impl SchedulingService {
    pub fn new(stores: Stores, config: Arc<AppConfig>, inventory: Arc<InventoryService>) -> Self {
        Self {
            stores,
            config,
            inventory,
        }
    }

    /// Bookable dates for a client, or `None` when nothing can be booked
    pub async fn window_for(
        &self,
        client_id: Uuid,
        kind: AppointmentKind,
        today: NaiveDate,
    ) -> AppResult<Option<AppointmentWindow>> {
        let client = fetch_required(self.stores.clients.as_ref(), client_id).await?;
        let inputs = self.window_inputs(&client).await?;
        Ok(calendar::appointment_window(kind, &inputs, today))
    }

    pub async fn schedule(&self, request: ScheduleRequest, today: NaiveDate) -> AppResult<Appointment> {
        let _guard = self.stores.write_lock.acquire().await;

        let client = fetch_required(self.stores.clients.as_ref(), request.client_id).await?;
        if client.status == ClientStatus::Removed {
            return Err(EntityError::invalid_state(
                "client",
                client.id,
                client.status(),
                "removed clients cannot be scheduled",
            )
            .into());
        }
        if matches!(request.kind, AppointmentKind::Install | AppointmentKind::Removal) {
            require_vehicle(request.vehicle_id)?;
        }
        if let Some(vehicle_id) = request.vehicle_id {
            let vehicle = fetch_required(self.stores.vehicles.as_ref(), vehicle_id).await?;
            if vehicle.client_id != client.id {
                return Err(
                    ValidationError::field("vehicle_id", "vehicle belongs to another client").into(),
                );
            }
        }
        if let Some(technician_id) = request.technician_id {
            self.check_technician(technician_id).await?;
        }
        let service_codes = self.check_codes(&request.service_codes).await?;

        let inputs = self.window_inputs(&client).await?;
        let window = calendar::appointment_window(request.kind, &inputs, today);
        let duration = request
            .duration_minutes
            .unwrap_or(self.config.scheduling.default_duration_minutes);

        let appointment = Appointment::new(
            Appointment::label(request.kind, request.scheduled_date),
            AppointmentStatus::Scheduled,
            client.id,
            request.vehicle_id,
            request.technician_id,
            request.kind,
            request.scheduled_date,
            request.start_time,
            duration,
            service_codes,
            None,
            None,
            filters::trim_optional(request.notes),
        );
        self.check_slot(&appointment, window).await?;

        let appointment = self.stores.appointments.create(appointment).await?;
        tracing::info!(
            appointment_id = %appointment.id,
            client_id = %appointment.client_id,
            kind = %appointment.kind,
            date = %appointment.scheduled_date,
            "appointment scheduled"
        );
        Ok(appointment)
    }

    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleRequest,
        today: NaiveDate,
    ) -> AppResult<Appointment> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut appointment = fetch_required(self.stores.appointments.as_ref(), appointment_id).await?;
        appointment.ensure_open("reschedule")?;
        if let Some(technician_id) = request.technician_id {
            self.check_technician(technician_id).await?;
            appointment.technician_id = Some(technician_id);
        }
        if let Some(codes) = request.service_codes {
            appointment.service_codes = self.check_codes(&codes).await?;
        }

        let client = fetch_required(self.stores.clients.as_ref(), appointment.client_id).await?;
        let inputs = self.window_inputs(&client).await?;
        let window = calendar::appointment_window(appointment.kind, &inputs, today);

        appointment.scheduled_date = request.scheduled_date;
        appointment.start_time = request.start_time;
        if let Some(minutes) = request.duration_minutes {
            appointment.duration_minutes = minutes;
        }
        appointment.name = Appointment::label(appointment.kind, appointment.scheduled_date);
        self.check_slot(&appointment, window).await?;

        appointment.touch();
        let appointment = self.stores.appointments.save(appointment).await?;
        tracing::info!(appointment_id = %appointment.id, date = %appointment.scheduled_date, "appointment rescheduled");
        Ok(appointment)
    }

    pub async fn cancel(&self, appointment_id: Uuid, request: CancelRequest) -> AppResult<Appointment> {
        let _guard = self.stores.write_lock.acquire().await;

        let mut appointment = fetch_required(self.stores.appointments.as_ref(), appointment_id).await?;
        appointment.ensure_open("cancel")?;

        if let Some(reason) = filters::trim_optional(request.reason) {
            appointment.notes = Some(match appointment.notes.take() {
                Some(notes) => format!("{notes}\n{reason}"),
                None => reason,
            });
        }
        appointment.set_status(if request.no_show {
            AppointmentStatus::NoShow
        } else {
            AppointmentStatus::Cancelled
        });

        let appointment = self.stores.appointments.save(appointment).await?;
        tracing::info!(appointment_id = %appointment.id, status = %appointment.status, "appointment closed");
        Ok(appointment)
    }

    /// Mark an appointment done and apply what the visit did to the device
    /// and client records.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        request: CompleteRequest,
        today: NaiveDate,
    ) -> AppResult<Appointment> {
        let guard = self.stores.write_lock.acquire().await;

        let mut appointment = fetch_required(self.stores.appointments.as_ref(), appointment_id).await?;
        appointment.ensure_open("complete")?;
        let mut client = fetch_required(self.stores.clients.as_ref(), appointment.client_id).await?;
        let done_on = request.completed_on.unwrap_or(appointment.scheduled_date);

        if let Some(codes) = request.service_codes {
            appointment.service_codes = self.check_codes(&codes).await?;
        }

        match appointment.kind {
            AppointmentKind::Install => {
                let vehicle_id = require_vehicle(appointment.vehicle_id)?;
                let device_id = match request.device_id {
                    Some(id) => id,
                    None => self.inventory.next_in_stock().await?.id,
                };
                let device = self.inventory.assign_held(&guard, device_id, vehicle_id, done_on).await?;
                appointment.device_id = Some(device.id);

                if client.install_date.is_none() {
                    client.install_date = Some(done_on);
                }
                client.set_status(ClientStatus::Active);
                client.refresh_removal_date();
                self.stores.clients.save(client).await?;
            }
            AppointmentKind::Removal => {
                let device = match appointment.vehicle_id {
                    Some(vehicle_id) => self.inventory.installed_in_vehicle(vehicle_id).await?,
                    None => self.inventory.installed_for_client(client.id).await?,
                };
                if let Some(device) = device {
                    self.inventory.release_held(&guard, device.id).await?;
                    appointment.device_id = Some(device.id);
                }
                client.removed_on = Some(done_on);
                client.set_status(ClientStatus::Removed);
                self.stores.clients.save(client).await?;
            }
            AppointmentKind::Calibration => {
                let device = match appointment.vehicle_id {
                    Some(vehicle_id) => self.inventory.installed_in_vehicle(vehicle_id).await?,
                    None => self.inventory.installed_for_client(client.id).await?,
                };
                let device = device.ok_or_else(|| {
                    EntityError::invalid_state(
                        "client",
                        client.id,
                        client.status(),
                        "no installed device to calibrate",
                    )
                })?;
                self.inventory.record_calibration_held(&guard, device.id, done_on).await?;
                appointment.device_id = Some(device.id);
            }
            AppointmentKind::Service | AppointmentKind::Lockout => {}
        }

        appointment.set_status(AppointmentStatus::Completed);
        let appointment = self.stores.appointments.save(appointment).await?;
        tracing::info!(
            appointment_id = %appointment.id,
            kind = %appointment.kind,
            %done_on,
            %today,
            "appointment completed"
        );
        Ok(appointment)
    }

    /// Live appointments in the range, in calendar order
    pub async fn list_in_range(
        &self,
        range: DateRange,
        technician_id: Option<Uuid>,
    ) -> AppResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .stores
            .appointments
            .list()
            .await?
            .into_iter()
            .filter(|a| !a.is_deleted() && range.contains(a.scheduled_date))
            .filter(|a| technician_id.is_none_or(|t| a.technician_id == Some(t)))
            .collect();
        appointments.sort_by_key(|a| (a.scheduled_date, a.start_time));
        Ok(appointments)
    }

    /// Start times on `date` still free for the technician; without one,
    /// every slot inside business hours
    pub async fn open_slots(
        &self,
        date: NaiveDate,
        technician_id: Option<Uuid>,
    ) -> AppResult<Vec<NaiveTime>> {
        let scheduling = &self.config.scheduling;
        let booked: Vec<Appointment> = match technician_id {
            Some(technician_id) => self
                .list_in_range(DateRange::today(date), Some(technician_id))
                .await?
                .into_iter()
                .filter(Appointment::is_open)
                .collect(),
            None => Vec::new(),
        };

        let slot = chrono::Duration::minutes(i64::from(scheduling.slot_minutes));
        Ok(calendar::slots(scheduling.open_time, scheduling.close_time, scheduling.slot_minutes)
            .into_iter()
            .filter(|start| {
                booked
                    .iter()
                    .all(|a| !(a.start_time < *start + slot && *start < a.end_time()))
            })
            .collect())
    }

    async fn window_inputs(&self, client: &Client) -> AppResult<WindowInputs> {
        let device = self.inventory.installed_for_client(client.id).await?;
        Ok(WindowInputs {
            install_date: client.install_date,
            last_calibrated: device.and_then(|d| d.last_calibrated),
            calibration_interval_days: client.calibration_interval_days,
            calibration_window_days: self.config.scheduling.calibration_window_days,
            removal_date: client.removal_date,
        })
    }

    async fn check_technician(&self, technician_id: Uuid) -> AppResult<()> {
        let user = fetch_required(self.stores.users.as_ref(), technician_id).await?;
        if user.status != UserStatus::Active {
            return Err(ValidationError::field("technician_id", "technician is inactive").into());
        }
        Ok(())
    }

    async fn check_codes(&self, codes: &[String]) -> AppResult<Vec<String>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let catalog = self.stores.services.list().await?;
        codes
            .iter()
            .map(|code| {
                let code = filters::uppercase(code);
                let known = catalog.iter().any(|item| {
                    item.code == code && item.status == ServiceItemStatus::Active && !item.is_deleted()
                });
                if known {
                    Ok(code)
                } else {
                    Err(BillingError::UnknownServiceCode(code).into())
                }
            })
            .collect()
    }

    /// Date window, business hours and double-booking checks
    async fn check_slot(&self, candidate: &Appointment, window: Option<AppointmentWindow>) -> AppResult<()> {
        let scheduling = &self.config.scheduling;
        match window {
            Some(window) if window.contains(candidate.scheduled_date) => {}
            window => {
                return Err(SchedulingError::OutsideWindow {
                    date: candidate.scheduled_date,
                    earliest: window.map(|w| w.earliest),
                    latest: window.and_then(|w| w.latest),
                }
                .into());
            }
        }

        if !calendar::within_hours(
            candidate.start_time,
            candidate.duration_minutes,
            scheduling.open_time,
            scheduling.close_time,
        ) {
            return Err(SchedulingError::OutsideBusinessHours(format!(
                "{}-{}",
                candidate.start_time.format("%H:%M"),
                candidate.end_time().format("%H:%M")
            ))
            .into());
        }

        let same_day = self
            .list_in_range(DateRange::today(candidate.scheduled_date), None)
            .await?;
        if let Some(existing) = calendar::conflicts(&same_day, candidate) {
            return Err(SchedulingError::Conflict(existing).into());
        }
        Ok(())
    }
}
