//! HTTP server: entity CRUD routes, domain action routes and the builder
//! that wires stores, services and the gateway together

pub mod builder;
pub mod crud;
pub mod entity_registry;
pub mod handlers;
pub mod host;
pub mod rest;

pub use builder::ServerBuilder;
pub use crud::CrudDescriptor;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use host::ServerHost;
pub use rest::RestExposure;
