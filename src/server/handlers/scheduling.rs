//! Appointment booking and calendar views

use crate::core::error::AppResult;
use crate::core::query::DateRangeQuery;
use crate::core::ValidatedJson;
use crate::core::validation::{Path, Query};
use crate::entities::{Appointment, AppointmentKind};
use crate::scheduling::calendar::{AppointmentWindow, DateRange};
use crate::scheduling::{CancelRequest, CompleteRequest, RescheduleRequest, ScheduleRequest};
use crate::server::host::ServerHost;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn routes() -> Router<ServerHost> {
    Router::new()
        .route("/appointments/schedule", post(schedule))
        .route("/appointments/range", get(list_range))
        .route("/appointments/slots", get(open_slots))
        .route("/appointments/{id}/complete", post(complete))
        .route("/appointments/{id}/cancel", post(cancel))
        .route("/appointments/{id}/reschedule", post(reschedule))
        .route("/clients/{id}/appointment-window", get(appointment_window))
}

/// `POST /appointments` books through the same checks as `/appointments/schedule`
pub fn create_appointment_route() -> MethodRouter<ServerHost> {
    post(schedule)
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub kind: AppointmentKind,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub client_id: Uuid,
    pub kind: AppointmentKind,
    pub today: NaiveDate,
    /// `null` when the client cannot book this kind of visit
    pub window: Option<AppointmentWindow>,
}

#[derive(Debug, Serialize)]
pub struct RangeListing {
    pub range: DateRange,
    pub data: Vec<Appointment>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub technician_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<NaiveTime>,
}

pub async fn schedule(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<ScheduleRequest>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let today = host.today();
    let appointment = host.scheduling.schedule(request, today).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn reschedule(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RescheduleRequest>,
) -> AppResult<Json<Appointment>> {
    let today = host.today();
    Ok(Json(host.scheduling.reschedule(id, request, today).await?))
}

pub async fn cancel(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CancelRequest>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(host.scheduling.cancel(id, request).await?))
}

pub async fn complete(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CompleteRequest>,
) -> AppResult<Json<Appointment>> {
    let today = host.today();
    Ok(Json(host.scheduling.complete(id, request, today).await?))
}

pub async fn list_range(
    State(host): State<ServerHost>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<RangeListing>> {
    let range = DateRange::from_query(&query, host.today())?;
    let data = host.scheduling.list_in_range(range, query.technician_id).await?;
    Ok(Json(RangeListing { range, data }))
}

pub async fn open_slots(
    State(host): State<ServerHost>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let slots = host.scheduling.open_slots(query.date, query.technician_id).await?;
    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}

pub async fn appointment_window(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<WindowResponse>> {
    let today = host.today();
    let window = host.scheduling.window_for(id, query.kind, today).await?;
    Ok(Json(WindowResponse {
        client_id: id,
        kind: query.kind,
        today,
        window,
    }))
}
