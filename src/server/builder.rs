//! ServerBuilder for fluent construction of the HTTP service

use super::crud::CrudDescriptor;
use super::entity_registry::EntityRegistry;
use super::handlers::{billing, scheduling};
use super::host::ServerHost;
use super::rest::RestExposure;
use crate::config::AppConfig;
use crate::core::events::EventBus;
use crate::entities::{
    Appointment, Client, Device, Invoice, Lead, Payment, ServiceItem, User, Vehicle,
};
use crate::gateway::{self, PaymentGateway};
use crate::storage::Stores;
use anyhow::Result;
use axum::Router;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Builder for the interlock admin HTTP service
///
/// # Example
///
/// ```rust,ignore
/// let config = AppConfig::load(Some(Path::new("config/interlock.yaml")))?;
/// ServerBuilder::new(config)
///     .with_event_bus(EventBus::new(1024))
///     .serve("0.0.0.0:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    stores: Option<Stores>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    event_bus: Option<EventBus>,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router<ServerHost>>,
}

impl ServerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            stores: None,
            gateway: None,
            event_bus: None,
            entity_registry: default_registry(),
            custom_routes: Vec::new(),
        }
    }

    /// Use these stores instead of fresh in-memory ones
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Use this gateway instead of the one named in configuration
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_custom_routes(mut self, routes: Router<ServerHost>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn entity_registry(&self) -> &EntityRegistry {
        &self.entity_registry
    }

    /// Build the shared state without a router
    pub fn build_host(&mut self) -> ServerHost {
        let stores = self.stores.take().unwrap_or_else(Stores::in_memory);
        let gateway = self
            .gateway
            .take()
            .unwrap_or_else(|| gateway::from_config(&self.config.gateway));
        let event_bus = self.event_bus.take().unwrap_or_default();

        ServerHost::new(self.config.clone(), stores, gateway, event_bus)
    }

    /// Build the router with tracing, timeout and CORS layers
    pub fn build(mut self) -> Result<Router> {
        let timeout = Duration::from_secs(self.config.server.request_timeout_secs);
        let host = self.build_host();
        let custom_routes = std::mem::take(&mut self.custom_routes);
        tracing::debug!(collections = ?self.entity_registry.collection_paths(), "registering routes");

        let app = RestExposure::build_router(host, &self.entity_registry, custom_routes)
            .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());
        Ok(app)
    }

    /// Bind, serve and shut down gracefully on Ctrl+C or SIGTERM
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Every entity gets CRUD routes; three of them are created through a
/// domain service instead of a plain body
fn default_registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry.register(Box::new(CrudDescriptor::<Lead>::new()));
    registry.register(Box::new(CrudDescriptor::<Client>::new()));
    registry.register(Box::new(CrudDescriptor::<Vehicle>::new()));
    registry.register(Box::new(CrudDescriptor::<Device>::new()));
    registry.register(Box::new(CrudDescriptor::<ServiceItem>::new()));
    registry.register(Box::new(CrudDescriptor::<User>::new()));
    registry.register(Box::new(
        CrudDescriptor::<Appointment>::new().with_create(scheduling::create_appointment_route),
    ));
    registry.register(Box::new(
        CrudDescriptor::<Invoice>::new().with_create(billing::create_invoice_route),
    ));
    registry.register(Box::new(
        CrudDescriptor::<Payment>::new().with_create(billing::create_payment_route),
    ));
    registry
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
