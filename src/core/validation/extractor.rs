//! Axum extractors that reject with the standard error body

use crate::core::error::{AppError, ValidationError};
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Axum extractor that deserializes a JSON body and runs its `Validate` rules
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn convert_lead(
///     ValidatedJson(payload): ValidatedJson<ConvertLeadRequest>,
/// ) -> AppResult<Json<Client>> {
///     // payload is already validated
/// }
/// ```
///
/// Malformed JSON and rule violations both reject with `422` and the
/// standard error body.
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ValidationError::Body(e.body_text()))?;

        payload.validate().map_err(ValidationError::from)?;

        Ok(ValidatedJson(payload))
    }
}

/// `axum::extract::Path` that rejects with `400` and the standard error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// `axum::extract::Query` that rejects with `400` and the standard error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        ValidationError::Path(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        ValidationError::Query(rejection.body_text()).into()
    }
}
