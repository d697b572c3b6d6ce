//! Shared request state
//!
//! `ServerHost` is the axum state for every route. It owns the stores, the
//! domain services built on top of them, the payment gateway and the event
//! bus. Cloning is cheap; every field is behind an `Arc`.

use crate::billing::BillingService;
use crate::config::AppConfig;
use crate::core::events::EventBus;
use crate::gateway::PaymentGateway;
use crate::inventory::InventoryService;
use crate::leads::LeadService;
use crate::scheduling::SchedulingService;
use crate::storage::Stores;
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerHost {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub gateway: Arc<dyn PaymentGateway>,
    pub event_bus: EventBus,
    pub billing: Arc<BillingService>,
    pub scheduling: Arc<SchedulingService>,
    pub inventory: Arc<InventoryService>,
    pub leads: Arc<LeadService>,
}

impl ServerHost {
    pub fn new(
        config: AppConfig,
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        event_bus: EventBus,
    ) -> Self {
        let config = Arc::new(config);
        let inventory = Arc::new(InventoryService::new(stores.clone(), event_bus.clone()));
        let billing = Arc::new(BillingService::new(
            stores.clone(),
            config.clone(),
            gateway.clone(),
            event_bus.clone(),
        ));
        let scheduling = Arc::new(SchedulingService::new(
            stores.clone(),
            config.clone(),
            inventory.clone(),
        ));
        let leads = Arc::new(LeadService::new(stores.clone(), config.clone(), event_bus.clone()));

        Self {
            config,
            stores,
            gateway,
            event_bus,
            billing,
            scheduling,
            inventory,
            leads,
        }
    }

    /// The business day requests are evaluated against
    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
