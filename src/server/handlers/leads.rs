//! Lead conversion

use crate::core::error::AppResult;
use crate::core::ValidatedJson;
use crate::core::validation::Path;
use crate::leads::{ConvertRequest, Conversion};
use crate::server::host::ServerHost;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

pub fn routes() -> Router<ServerHost> {
    Router::new().route("/leads/{id}/convert", post(convert))
}

pub async fn convert(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ConvertRequest>,
) -> AppResult<(StatusCode, Json<Conversion>)> {
    let conversion = host.leads.convert(id, request).await?;
    Ok((StatusCode::CREATED, Json(conversion)))
}
