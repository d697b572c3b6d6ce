//! Invoices, balances and payments over HTTP

mod common;

use axum::http::StatusCode;
use common::{TestApp, dec, days_from_today, id_of, money, spawn_app, today};
use interlock::gateway::sandbox::SandboxStatus;
use serde_json::{Value, json};

/// Client installed 28 days ago at $3.50/day, one open rent invoice of $104.49
async fn invoiced_client(app: &TestApp) -> (String, Value) {
    let client = app.create_client(Some(days_from_today(-28))).await;
    let client_id = id_of(&client);
    let invoice = app
        .post_created(
            "/invoices",
            json!({ "client_id": client_id, "rent_through": today() }),
        )
        .await;
    (client_id, invoice)
}

#[tokio::test]
async fn test_preview_prices_without_saving() {
    let app = spawn_app();
    app.seed_catalog().await;
    let client = app.create_client(Some(days_from_today(-38))).await;

    let response = app
        .server
        .post("/invoices/preview")
        .json(&json!({
            "client_id": client["id"],
            "rent_through": today(),
            "service_codes": ["cal"],
            "discounts": [{ "description": "Hardship", "amount": "10.00" }]
        }))
        .await;
    response.assert_status_ok();
    let preview: Value = response.json();

    let lines = preview["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["kind"], "rent");
    assert_eq!(dec(&lines[0]["amount"]), money("98.00"));
    assert_eq!(lines[1]["quantity"], 10);
    assert_eq!(dec(&lines[1]["amount"]), money("35.00"));
    assert_eq!(lines[2]["code"], "CAL");
    assert_eq!(lines[3]["kind"], "discount");
    assert_eq!(dec(&lines[3]["amount"]), money("-10.00"));
    // taxable 178.00 × 0.06625 = 11.7925
    assert_eq!(dec(&preview["subtotal"]), money("168.00"));
    assert_eq!(dec(&preview["tax"]), money("11.79"));
    assert_eq!(dec(&preview["total"]), money("179.79"));

    let invoices: Value = app.server.get("/invoices").await.json();
    assert_eq!(invoices["pagination"]["total"], 0);
    let stored: Value = app.server.get(&format!("/clients/{}", id_of(&client))).await.json();
    assert!(stored["billed_through"].is_null());
}

#[tokio::test]
async fn test_assemble_numbers_invoice_and_advances_billed_through() {
    let app = spawn_app();
    let (client_id, invoice) = invoiced_client(&app).await;

    let expected_number = format!("INV-{}-0001", today().format("%Y%m%d"));
    assert_eq!(invoice["number"], expected_number);
    assert_eq!(invoice["status"], "open");
    assert_eq!(invoice["due_date"], json!(days_from_today(14)));
    assert_eq!(dec(&invoice["subtotal"]), money("98.00"));
    assert_eq!(dec(&invoice["tax"]), money("6.49"));
    assert_eq!(dec(&invoice["total"]), money("104.49"));
    assert_eq!(invoice["rent_through"], json!(today()));

    let client: Value = app.server.get(&format!("/clients/{client_id}")).await.json();
    assert_eq!(client["billed_through"], json!(today()));

    // Nothing left to bill
    let response = app
        .server
        .post("/invoices/assemble")
        .json(&json!({ "client_id": client_id, "rent_through": today() }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let second = app
        .post_created(
            "/invoices/assemble",
            json!({
                "client_id": client_id,
                "fees": [{ "description": "Court report", "amount": "15.00", "taxable": false }]
            }),
        )
        .await;
    assert_eq!(second["number"], format!("INV-{}-0002", today().format("%Y%m%d")));
    assert_eq!(dec(&second["total"]), money("15.00"));
}

#[tokio::test]
async fn test_rent_needs_install_and_codes_must_exist() {
    let app = spawn_app();
    let pending = app.create_client(None).await;

    let response = app
        .server
        .post("/invoices/preview")
        .json(&json!({ "client_id": pending["id"], "rent_through": today() }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .server
        .post("/invoices/preview")
        .json(&json!({ "client_id": pending["id"], "service_codes": ["NOPE"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("NOPE"));
}

#[tokio::test]
async fn test_split_payment_returns_change_and_settles_invoice() {
    let app = spawn_app();
    let (client_id, invoice) = invoiced_client(&app).await;

    let receipt = app
        .post_created(
            &format!("/invoices/{}/payments", id_of(&invoice)),
            json!({
                "tenders": [
                    { "method": "cash", "amount": "50.00" },
                    { "method": "card", "amount": "60.00", "token": "tok_visa" }
                ]
            }),
        )
        .await;

    let payments = receipt["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0]["method"], "card");
    assert!(payments[0]["gateway_transaction_id"].is_string());
    assert_eq!(dec(&payments[1]["amount"]), money("44.49"));
    assert_eq!(dec(&receipt["total_applied"]), money("104.49"));
    assert_eq!(dec(&receipt["change_due"]), money("5.51"));
    assert_eq!(dec(&receipt["remaining_due"]), money("0"));
    assert_eq!(receipt["invoice"]["status"], "paid");

    let statement: Value = app
        .server
        .get(&format!("/clients/{client_id}/balance"))
        .await
        .json();
    assert_eq!(statement["elapsed_days"], 28);
    assert_eq!(dec(&statement["rent_accrued"]), money("98.00"));
    assert_eq!(dec(&statement["other_charges"]), money("6.49"));
    assert_eq!(dec(&statement["balance"]), money("0"));

    // A settled invoice takes no more money
    let response = app
        .server
        .post(&format!("/invoices/{}/payments", id_of(&invoice)))
        .json(&json!({ "tenders": [{ "method": "cash", "amount": "1.00" }] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_partial_payment_leaves_invoice_partial() {
    let app = spawn_app();
    let (_, invoice) = invoiced_client(&app).await;

    let receipt = app
        .post_created(
            &format!("/invoices/{}/payments", id_of(&invoice)),
            json!({ "tenders": [{ "method": "money_order", "amount": "40.00", "reference": "MO-5531" }] }),
        )
        .await;
    assert_eq!(receipt["invoice"]["status"], "partial");
    assert_eq!(dec(&receipt["remaining_due"]), money("64.49"));
    assert_eq!(receipt["payments"][0]["reference"], "MO-5531");
}

#[tokio::test]
async fn test_declined_card_records_nothing_and_voids_approved_cards() {
    let app = spawn_app();
    let (client_id, invoice) = invoiced_client(&app).await;

    let response = app
        .server
        .post(&format!("/invoices/{}/payments", id_of(&invoice)))
        .json(&json!({
            "tenders": [
                { "method": "card", "amount": "50.00", "token": "tok_visa" },
                { "method": "card", "amount": "40.00", "token": "tok_decline_insufficient" }
            ]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["code"], "CARD_DECLINED");

    let payments: Value = app
        .server
        .get("/payments")
        .add_query_param("client_id", &client_id)
        .await
        .json();
    assert_eq!(payments["pagination"]["total"], 0);

    let stored: Value = app.server.get(&format!("/invoices/{}", id_of(&invoice))).await.json();
    assert_eq!(stored["status"], "open");
    assert_eq!(dec(&stored["amount_paid"]), money("0"));

    let statuses: Vec<SandboxStatus> = app.gateway.transactions().iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![SandboxStatus::Voided, SandboxStatus::Declined]);
}

#[tokio::test]
async fn test_tender_rules() {
    let app = spawn_app();
    let (_, invoice) = invoiced_client(&app).await;
    let path = format!("/invoices/{}/payments", id_of(&invoice));

    let response = app
        .server
        .post(&path)
        .json(&json!({ "tenders": [{ "method": "check", "amount": "200.00", "reference": "881" }] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "OVERPAYMENT");

    let response = app
        .server
        .post(&path)
        .json(&json!({ "tenders": [{ "method": "check", "amount": "20.00" }] }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TENDER");

    let response = app.server.post(&path).json(&json!({ "tenders": [] })).await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_void_payment_reopens_invoice() {
    let app = spawn_app();
    let (_, invoice) = invoiced_client(&app).await;

    let receipt = app
        .post_created(
            &format!("/invoices/{}/payments", id_of(&invoice)),
            json!({ "tenders": [{ "method": "card", "amount": "104.49", "token": "tok_mc" }] }),
        )
        .await;
    assert_eq!(receipt["invoice"]["status"], "paid");
    let payment_id = id_of(&receipt["payments"][0]);

    let response = app.server.post(&format!("/payments/{payment_id}/void")).await;
    response.assert_status_ok();
    let voided: Value = response.json();
    assert_eq!(voided["status"], "voided");

    let stored: Value = app.server.get(&format!("/invoices/{}", id_of(&invoice))).await.json();
    assert_eq!(stored["status"], "open");
    assert_eq!(dec(&stored["amount_paid"]), money("0"));
    assert_eq!(app.gateway.transactions()[0].status, SandboxStatus::Voided);

    let response = app.server.post(&format!("/payments/{payment_id}/void")).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // Voided payments may be deleted, completed ones may not
    let response = app.server.delete(&format!("/payments/{payment_id}")).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_account_payment_and_balance_as_of() {
    let app = spawn_app();
    let client = app.create_client(Some(days_from_today(-28))).await;
    let client_id = id_of(&client);

    let receipt = app
        .post_created(
            "/payments",
            json!({
                "client_id": client_id,
                "tenders": [{ "method": "cash", "amount": "20.00" }]
            }),
        )
        .await;
    assert!(receipt.get("invoice").is_none());
    assert!(receipt.get("remaining_due").is_none());
    let payment_id = id_of(&receipt["payments"][0]);

    let response = app.server.delete(&format!("/payments/{payment_id}")).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let statement: Value = app
        .server
        .get(&format!("/clients/{client_id}/balance"))
        .await
        .json();
    assert_eq!(dec(&statement["balance"]), money("78.00"));

    let earlier: Value = app
        .server
        .get(&format!("/clients/{client_id}/balance"))
        .add_query_param("as_of", days_from_today(-18).to_string())
        .await
        .json();
    assert_eq!(earlier["elapsed_days"], 10);
    assert_eq!(dec(&earlier["balance"]), money("15.00"));
}

#[tokio::test]
async fn test_invoices_with_payments_cannot_be_deleted() {
    let app = spawn_app();
    let (_, invoice) = invoiced_client(&app).await;
    let invoice_id = id_of(&invoice);

    app.post_created(
        &format!("/invoices/{invoice_id}/payments"),
        json!({ "tenders": [{ "method": "cash", "amount": "10.00" }] }),
    )
    .await;

    let response = app.server.delete(&format!("/invoices/{invoice_id}")).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_large_credit_at_tiny_rate_keeps_balance_readable() {
    let app = spawn_app();
    let client = app.create_client(Some(days_from_today(-10))).await;
    let client_id = id_of(&client);

    let response = app
        .server
        .put(&format!("/clients/{client_id}"))
        .json(&json!({ "daily_rate": "0.01" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/payments")
        .json(&json!({
            "client_id": client_id,
            "tenders": [{ "method": "cash", "amount": "1000000.00" }]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let tenders: Vec<Value> = (0..8)
        .map(|_| json!({ "method": "cash", "amount": "100000.00" }))
        .collect();
    for _ in 0..2 {
        app.post_created(
            "/payments",
            json!({ "client_id": client_id, "tenders": tenders }),
        )
        .await;
    }

    let response = app
        .server
        .get(&format!("/clients/{client_id}/balance"))
        .await;
    response.assert_status_ok();
    let statement: Value = response.json();
    assert_eq!(dec(&statement["payments"]), money("1600000.00"));
    assert_eq!(dec(&statement["balance"]), money("-1599999.90"));
    assert!(statement["paid_through"].is_null());
}
