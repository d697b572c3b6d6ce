//! Core module containing the fundamental traits and types of the service

pub mod entity;
pub mod error;
pub mod events;
pub mod field;
pub mod query;
pub mod resource;
pub mod service;
pub mod validation;

pub use entity::{Data, Entity};
pub use error::{AppError, AppResult};
pub use events::{DomainEvent, EventBus};
pub use field::{FieldFormat, FieldValue, IntoFieldValue};
pub use query::{DateRangeQuery, PaginatedResponse, QueryParams};
pub use resource::{NoInput, Resource};
pub use service::DataService;
pub use validation::ValidatedJson;
