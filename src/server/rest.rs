//! REST router assembly
//!
//! Consumes a [`ServerHost`] and produces the axum `Router` with health,
//! entity CRUD, domain action and custom routes.

use super::entity_registry::EntityRegistry;
use super::handlers::action_routes;
use super::host::ServerHost;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub struct RestExposure;

impl RestExposure {
    /// Build the full router and bind it to the host state
    pub fn build_router(
        host: ServerHost,
        registry: &EntityRegistry,
        custom_routes: Vec<Router<ServerHost>>,
    ) -> Router {
        let mut app = Self::health_routes()
            .merge(registry.build_routes())
            .merge(action_routes());

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        app.with_state(host)
    }

    fn health_routes() -> Router<ServerHost> {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "interlock-admin"
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::events::EventBus;
    use crate::gateway::SandboxGateway;
    use crate::storage::Stores;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn host() -> ServerHost {
        ServerHost::new(
            AppConfig::default(),
            Stores::in_memory(),
            Arc::new(SandboxGateway::new(None)),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = RestExposure::build_router(host(), &EntityRegistry::new(), Vec::new());

        for path in ["/health", "/healthz"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["status"], "ok");
            assert_eq!(json["service"], "interlock-admin");
        }
    }

    #[tokio::test]
    async fn test_custom_routes_are_merged() {
        let custom = Router::new().route("/ping", get(|| async { "pong" }));
        let app = RestExposure::build_router(host(), &EntityRegistry::new(), vec![custom]);
        let response = app
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
