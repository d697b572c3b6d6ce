//! Shared harness for the HTTP integration tests

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{Duration, Local, NaiveDate};
use interlock::prelude::*;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;

pub struct TestApp {
    pub server: TestServer,
    pub stores: Stores,
    pub events: EventBus,
    pub gateway: SandboxGateway,
}

/// Server over fresh in-memory stores with the sandbox gateway declining
/// any charge above $500
pub fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default())
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let stores = Stores::in_memory();
    let events = EventBus::default();
    let gateway = SandboxGateway::new(Some(Decimal::new(50000, 2)));
    let app = ServerBuilder::new(config)
        .with_stores(stores.clone())
        .with_gateway(Arc::new(gateway.clone()))
        .with_event_bus(events.clone())
        .build()
        .expect("router builds");
    let server = TestServer::new(app).expect("Failed to create test server");
    TestApp {
        server,
        stores,
        events,
        gateway,
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

/// Parse a decimal rendered as a JSON string or number
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

pub fn money(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("id field").to_string()
}

impl TestApp {
    pub async fn post_created(&self, path: &str, body: Value) -> Value {
        let response = self.server.post(path).json(&body).await;
        assert_eq!(
            response.status_code(),
            201,
            "POST {path} failed: {}",
            response.text()
        );
        response.json()
    }

    pub async fn create_client(&self, install_date: Option<NaiveDate>) -> Value {
        self.post_created(
            "/clients",
            json!({
                "first_name": "Dana",
                "last_name": "Whitfield",
                "phone": "(609) 555-0147",
                "email": "Dana.Whitfield@example.com",
                "address": "44 Mercer St, Hamilton NJ",
                "driver_license": "w1234 56789 01234",
                "install_date": install_date,
                "daily_rate": "3.50"
            }),
        )
        .await
    }

    pub async fn create_vehicle(&self, client_id: &str) -> Value {
        self.create_vehicle_with_vin(client_id, "1HGCM82633A004352").await
    }

    pub async fn create_vehicle_with_vin(&self, client_id: &str, vin: &str) -> Value {
        self.post_created(
            "/vehicles",
            json!({
                "client_id": client_id,
                "make": "Honda",
                "model": "Civic",
                "year": 2016,
                "vin": vin,
                "plate": "K42LMN"
            }),
        )
        .await
    }

    pub async fn create_device(&self, serial: &str) -> Value {
        self.post_created(
            "/devices",
            json!({
                "serial_number": serial,
                "model": "LifeSafer FC100"
            }),
        )
        .await
    }

    pub async fn create_service(&self, code: &str, price: &str, kind: &str) -> Value {
        self.post_created(
            "/services",
            json!({
                "code": code,
                "description": format!("{code} service"),
                "price": price,
                "kind": kind
            }),
        )
        .await
    }

    pub async fn create_technician(&self, name: &str) -> Value {
        self.post_created(
            "/users",
            json!({
                "name": name,
                "email": format!("{}@interlock.test", name.to_lowercase().replace(' ', ".")),
                "role": "technician"
            }),
        )
        .await
    }

    /// Standard catalog: install $100, calibration $45, removal $75
    pub async fn seed_catalog(&self) {
        self.create_service("INSTALL", "100.00", "install").await;
        self.create_service("CAL", "45.00", "calibration").await;
        self.create_service("REMOVE", "75.00", "removal").await;
    }
}
