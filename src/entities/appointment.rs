//! Technician visits: installs, calibrations, removals and service calls
//!
//! Appointments are created through the scheduling service so the booking
//! window, business hours and conflicts are checked; the generic update only
//! edits notes and the assigned technician.

use crate::config::AppConfig;
use crate::core::error::{AppResult, EntityError};
use crate::core::service::{DataService, fetch_required};
use crate::core::validation::filters;
use crate::core::{Entity, NoInput, Resource};
use crate::storage::Stores;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

crate::string_enum!(AppointmentKind {
    Install => "install",
    Calibration => "calibration",
    Removal => "removal",
    Service => "service",
    Lockout => "lockout",
});

crate::impl_data_entity!(Appointment, "appointment", "appointments", AppointmentStatus, ["name", "client_id", "vehicle_id", "technician_id", "kind", "scheduled_date", "status"], {
    client_id: Uuid,
    #[serde(default)]
    vehicle_id: Option<Uuid>,
    #[serde(default)]
    technician_id: Option<Uuid>,
    kind: AppointmentKind,
    scheduled_date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: u32,
    /// Catalog codes billed when the appointment is invoiced
    #[serde(default)]
    service_codes: Vec<String>,
    #[serde(default)]
    invoice_id: Option<Uuid>,
    /// Device installed or removed during the visit
    #[serde(default)]
    device_id: Option<Uuid>,
    #[serde(default)]
    notes: Option<String>,
});

impl Appointment {
    pub fn label(kind: AppointmentKind, date: NaiveDate) -> String {
        format!("{kind} {date}")
    }

    pub fn end_time(&self) -> NaiveTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_open(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    /// Fail unless the appointment is still scheduled
    pub fn ensure_open(&self, action: &str) -> AppResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(EntityError::invalid_state(
                "appointment",
                self.id,
                self.status(),
                format!("cannot {action} an appointment that is not scheduled"),
            )
            .into())
        }
    }
}

/// Generic `PUT` body. Date, time, technician and billed codes change only
/// through `/appointments/{id}/reschedule`, where booking rules are checked.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateAppointment {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[async_trait]
impl Resource for Appointment {
    type Create = NoInput;
    type Update = UpdateAppointment;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.appointments.clone()
    }

    fn from_create(input: NoInput, _config: &AppConfig) -> AppResult<Self> {
        match input {}
    }

    fn apply_update(&mut self, input: UpdateAppointment, _config: &AppConfig) -> AppResult<()> {
        if input.notes.is_some() {
            self.notes = filters::trim_optional(input.notes);
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        fetch_required(stores.clients.as_ref(), self.client_id).await?;
        if let Some(vehicle_id) = self.vehicle_id {
            fetch_required(stores.vehicles.as_ref(), vehicle_id).await?;
        }
        if let Some(technician_id) = self.technician_id {
            fetch_required(stores.users.as_ref(), technician_id).await?;
        }
        Ok(())
    }

    async fn check_delete(&self, _stores: &Stores) -> AppResult<()> {
        match self.invoice_id {
            Some(_) => Err(EntityError::invalid_state(
                "appointment",
                self.id,
                self.status(),
                "invoiced appointments cannot be deleted",
            )
            .into()),
            None => Ok(()),
        }
    }
}
