//! Device custody actions

use crate::core::error::AppResult;
use crate::core::ValidatedJson;
use crate::core::validation::Path;
use crate::entities::Device;
use crate::inventory::{AssignRequest, StockSummary, TransitionRequest};
use crate::server::host::ServerHost;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

pub fn routes() -> Router<ServerHost> {
    Router::new()
        .route("/devices/summary", get(stock_summary))
        .route("/devices/{id}/assign", post(assign))
        .route("/devices/{id}/release", post(release))
        .route("/devices/{id}/transition", post(transition))
}

pub async fn assign(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<AssignRequest>,
) -> AppResult<Json<Device>> {
    let installed_on = request.installed_on.unwrap_or_else(|| host.today());
    Ok(Json(host.inventory.assign(id, request.vehicle_id, installed_on).await?))
}

pub async fn release(State(host): State<ServerHost>, Path(id): Path<Uuid>) -> AppResult<Json<Device>> {
    Ok(Json(host.inventory.release(id).await?))
}

pub async fn transition(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<TransitionRequest>,
) -> AppResult<Json<Device>> {
    Ok(Json(host.inventory.transition(id, request).await?))
}

pub async fn stock_summary(State(host): State<ServerHost>) -> AppResult<Json<StockSummary>> {
    Ok(Json(host.inventory.stock_summary().await?))
}
