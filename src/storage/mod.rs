//! Storage implementations and the per-entity store bundle

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryDataService;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDataService;

use crate::core::DataService;
use crate::core::service::WriteLock;
use crate::entities::{
    Appointment, Client, Device, Invoice, Lead, Payment, ServiceItem, User, Vehicle,
};
use std::sync::Arc;

/// One store per entity, shared by handlers and domain services, plus the
/// lock their read-modify-write cycles run under
#[derive(Clone)]
pub struct Stores {
    pub leads: Arc<dyn DataService<Lead>>,
    pub clients: Arc<dyn DataService<Client>>,
    pub vehicles: Arc<dyn DataService<Vehicle>>,
    pub devices: Arc<dyn DataService<Device>>,
    pub services: Arc<dyn DataService<ServiceItem>>,
    pub appointments: Arc<dyn DataService<Appointment>>,
    pub invoices: Arc<dyn DataService<Invoice>>,
    pub payments: Arc<dyn DataService<Payment>>,
    pub users: Arc<dyn DataService<User>>,
    pub write_lock: WriteLock,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            leads: Arc::new(InMemoryDataService::new()),
            clients: Arc::new(InMemoryDataService::new()),
            vehicles: Arc::new(InMemoryDataService::new()),
            devices: Arc::new(InMemoryDataService::new()),
            services: Arc::new(InMemoryDataService::new()),
            appointments: Arc::new(InMemoryDataService::new()),
            invoices: Arc::new(InMemoryDataService::new()),
            payments: Arc::new(InMemoryDataService::new()),
            users: Arc::new(InMemoryDataService::new()),
            write_lock: WriteLock::new(),
        }
    }

    /// All stores share one pool and one `entities` table
    #[cfg(feature = "postgres")]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            leads: Arc::new(PostgresDataService::new(pool.clone())),
            clients: Arc::new(PostgresDataService::new(pool.clone())),
            vehicles: Arc::new(PostgresDataService::new(pool.clone())),
            devices: Arc::new(PostgresDataService::new(pool.clone())),
            services: Arc::new(PostgresDataService::new(pool.clone())),
            appointments: Arc::new(PostgresDataService::new(pool.clone())),
            invoices: Arc::new(PostgresDataService::new(pool.clone())),
            payments: Arc::new(PostgresDataService::new(pool.clone())),
            users: Arc::new(PostgresDataService::new(pool)),
            write_lock: WriteLock::new(),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::in_memory()
    }
}
