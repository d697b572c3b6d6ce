//! Typed error handling for the interlock admin service
//!
//! Every fallible domain operation returns [`AppResult`]. Handlers return the
//! error directly; [`AppError`] implements `IntoResponse` and renders a stable
//! `{code, message, details}` body with the right HTTP status.
//!
//! # Error Categories
//!
//! - [`EntityError`]: record lookup and lifecycle errors
//! - [`ValidationError`]: rejected input
//! - [`BillingError`]: invoice assembly and balance errors
//! - [`SchedulingError`]: appointment window and conflict errors
//! - [`InventoryError`]: device lifecycle errors
//! - [`PaymentError`]: tender and gateway errors
//! - [`StorageError`]: storage backend failures
//! - [`ConfigError`]: configuration parsing and validation

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// The main error type for the service
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Entity(e) => e.status_code(),
            AppError::Validation(e) => e.status_code(),
            AppError::Billing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Scheduling(e) => e.status_code(),
            AppError::Inventory(e) => e.status_code(),
            AppError::Payment(e) => e.status_code(),
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Entity(e) => e.error_code(),
            AppError::Validation(e) => e.error_code(),
            AppError::Billing(_) => "BILLING_ERROR",
            AppError::Scheduling(e) => e.error_code(),
            AppError::Inventory(e) => e.error_code(),
            AppError::Payment(e) => e.error_code(),
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Entity(EntityError::NotFound { entity_type, id }) => Some(serde_json::json!({
                "entity_type": entity_type,
                "id": id.to_string()
            })),
            AppError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            AppError::Scheduling(SchedulingError::OutsideWindow { date, earliest, latest }) => {
                Some(serde_json::json!({
                    "date": date,
                    "earliest": earliest,
                    "latest": latest
                }))
            }
            AppError::Payment(PaymentError::Declined { reason, .. }) => {
                Some(serde_json::json!({ "reason": reason }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    #[error("{entity_type} with id '{id}' already exists")]
    AlreadyExists { entity_type: String, id: Uuid },

    /// The record exists but its current status forbids the operation
    #[error("{entity_type} '{id}' is {status}: {message}")]
    InvalidState {
        entity_type: String,
        id: Uuid,
        status: String,
        message: String,
    },
}

impl EntityError {
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn invalid_state(entity_type: &str, id: Uuid, status: &str, message: impl Into<String>) -> Self {
        EntityError::InvalidState {
            entity_type: entity_type.to_string(),
            id,
            status: status.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } | EntityError::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::InvalidState { .. } => "ENTITY_INVALID_STATE",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation failed for {} field(s)", .0.len())]
    FieldErrors(Vec<FieldValidationError>),

    #[error("Invalid request body: {0}")]
    Body(String),

    #[error("Invalid path parameter: {0}")]
    Path(String),

    #[error("Invalid query string: {0}")]
    Query(String),
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Unparseable URLs are the client's fault but not a rule violation
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::Path(_) | ValidationError::Query(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Path(_) | ValidationError::Query(_) => "BAD_REQUEST",
            _ => "VALIDATION_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

// =============================================================================
// Billing Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invoice has no lines")]
    EmptyInvoice,

    #[error("Unknown service code: {0}")]
    UnknownServiceCode(String),

    #[error("Client {0} has no install date; rent cannot be billed")]
    NotInstalled(Uuid),

    #[error("Invalid amount {amount}: {message}")]
    InvalidAmount { amount: Decimal, message: String },
}

// =============================================================================
// Scheduling Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Date {date} is outside the allowed window")]
    OutsideWindow {
        date: NaiveDate,
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
    },

    #[error("Appointment time {0} is outside business hours")]
    OutsideBusinessHours(String),

    #[error("Conflicts with appointment {0}")]
    Conflict(Uuid),

    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Unknown range preset: {0}")]
    UnknownPreset(String),
}

impl SchedulingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SchedulingError::Conflict(_) => StatusCode::CONFLICT,
            SchedulingError::InvalidRange { .. } | SchedulingError::UnknownPreset(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SchedulingError::OutsideWindow { .. } => "OUTSIDE_WINDOW",
            SchedulingError::OutsideBusinessHours(_) => "OUTSIDE_BUSINESS_HOURS",
            SchedulingError::Conflict(_) => "SCHEDULE_CONFLICT",
            SchedulingError::InvalidRange { .. } => "INVALID_RANGE",
            SchedulingError::UnknownPreset(_) => "UNKNOWN_PRESET",
        }
    }
}

// =============================================================================
// Inventory Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Device {device_id} cannot move from {from} to {to}")]
    IllegalTransition {
        device_id: Uuid,
        from: String,
        to: String,
    },

    #[error("Vehicle {vehicle_id} already has device {device_id} installed")]
    VehicleOccupied { vehicle_id: Uuid, device_id: Uuid },

    #[error("No device available in stock")]
    NoStock,
}

impl InventoryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            InventoryError::NoStock => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            InventoryError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            InventoryError::VehicleOccupied { .. } => "VEHICLE_OCCUPIED",
            InventoryError::NoStock => "NO_STOCK",
        }
    }
}

// =============================================================================
// Payment Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Card declined: {reason}")]
    Declined { reason: String, voided: Vec<String> },

    #[error("Payment gateway failure: {0}")]
    Gateway(String),

    #[error("Invalid tender: {0}")]
    InvalidTender(String),

    #[error("Tenders exceed amount due ({due})")]
    Overpayment { due: Decimal },
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Declined { .. } => StatusCode::PAYMENT_REQUIRED,
            PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
            PaymentError::InvalidTender(_) | PaymentError::Overpayment { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::Declined { .. } => "CARD_DECLINED",
            PaymentError::Gateway(_) => "GATEWAY_ERROR",
            PaymentError::InvalidTender(_) => "INVALID_TENDER",
            PaymentError::Overpayment { .. } => "OVERPAYMENT",
        }
    }
}

// =============================================================================
// Storage / Config Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Storage(StorageError::Backend(err.to_string()))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(ValidationError::Body(err.to_string()))
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;
