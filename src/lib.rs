//! # Interlock Admin
//!
//! Business administration backend for a company that leases, installs and
//! services ignition interlock devices.
//!
//! ## Features
//!
//! - **Entity Records**: leads, clients, vehicles, devices, service catalog,
//!   appointments, invoices, payments and staff users, with soft delete and
//!   automatic timestamps
//! - **Billing**: daily-rate rent accrual, four-week rental periods with
//!   prorated tails, catalog services, fees, discounts and sales tax
//! - **Payments**: split tenders across cash, check, money order and card,
//!   with change calculation and card voids through a payment gateway
//! - **Scheduling**: appointment windows driven by calibration intervals and
//!   monitoring terms, business hours and technician conflicts
//! - **Inventory**: device lifecycle with guarded status transitions
//! - **Pluggable Storage**: in-memory by default, PostgreSQL behind the
//!   `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use interlock::prelude::*;
//!
//! let config = AppConfig::load(None)?;
//! ServerBuilder::new(config)
//!     .with_stores(Stores::in_memory())
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod billing;
pub mod config;
pub mod core;
pub mod entities;
pub mod gateway;
pub mod inventory;
pub mod leads;
pub mod scheduling;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        entity::{Data, Entity},
        error::{AppError, AppResult},
        events::{DomainEvent, EventBus, spawn_audit_logger},
        field::{FieldFormat, FieldValue},
        resource::Resource,
        service::DataService,
    };

    // === Macros ===
    pub use crate::{impl_data_entity, string_enum};

    // === Entities ===
    pub use crate::entities::{
        Appointment, AppointmentKind, AppointmentStatus, Client, ClientStatus, Device,
        DeviceStatus, Invoice, InvoiceStatus, Lead, LeadStatus, Payment, PaymentMethod,
        PaymentStatus, ServiceItem, ServiceItemStatus, ServiceKind, User, UserRole, UserStatus,
        Vehicle, VehicleStatus,
    };

    // === Domain Services ===
    pub use crate::billing::{BillingService, InvoiceRequest, PaymentRequest, Tender};
    pub use crate::inventory::InventoryService;
    pub use crate::leads::LeadService;
    pub use crate::scheduling::{ScheduleRequest, SchedulingService};

    // === Configuration and Storage ===
    pub use crate::config::AppConfig;
    pub use crate::gateway::{PaymentGateway, SandboxGateway};
    pub use crate::storage::{InMemoryDataService, Stores};

    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresDataService;

    // === Server ===
    pub use crate::server::{ServerBuilder, ServerHost};

    // === Common External Types ===
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
