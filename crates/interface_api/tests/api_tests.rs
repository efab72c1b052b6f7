//! HTTP API tests against the in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

use core_kernel::{Currency, Money};
use domain_demurrage::{
    issue_invoice, Customer, DemurragePort, Fault, FixedClock, InMemoryDemurrageStore, InvoiceStatus,
    NewInvoice,
};
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{BillOfLadingBuilder, ContainerFixtures, CustomerFixtures, DateFixtures};

const SECRET: &str = "api-test-secret";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct TestApp {
    store: InMemoryDemurrageStore,
    router: Router,
    alpha: Customer,
    beta: Customer,
}

/// App whose clock reads 2026-01-15
async fn app() -> TestApp {
    let store = InMemoryDemurrageStore::new();
    let alpha = store.create_customer(CustomerFixtures::alpha()).await.unwrap();
    let beta = store.create_customer(CustomerFixtures::beta()).await.unwrap();

    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(FixedClock(DateFixtures::four_days_later())),
        config,
    );

    TestApp {
        router: create_router(state),
        store,
        alpha,
        beta,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn invoice(&self, customer: &Customer, bl_number: &str, due: NaiveDate, status: InvoiceStatus) -> i64 {
        self.store
            .create_bill_of_lading(
                BillOfLadingBuilder::new()
                    .with_bl_number(bl_number)
                    .for_customer(customer.id)
                    .build_valid(),
            )
            .await
            .unwrap();
        let invoice = NewInvoice::new(
            customer.id,
            bl_number.parse().unwrap(),
            Money::new(dec!(400), Currency::USD),
        )
        .with_status(status)
        .with_due_date(due);
        issue_invoice(&self.store, invoice).await.unwrap().id.value()
    }
}

fn customer_get(uri: &str, customer: &Customer) -> Request<Body> {
    Request::get(uri)
        .header("X-Api-Token", customer.api_token.as_str())
        .body(Body::empty())
        .unwrap()
}

fn generate_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post("/invoices/generate").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn token_with(role: &str) -> String {
    create_token("ops", vec![role.to_string()], SECRET, 300).unwrap()
}

#[tokio::test]
async fn test_health_reports_connected_store() {
    let app = app().await;

    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_reports_unavailable_store() {
    let app = app().await;
    app.store.inject_fault(Fault::Unavailable).await;

    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_overdue_requires_token() {
    let app = app().await;

    let (status, body) = app
        .send(Request::get("/invoices/overdue").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing X-Api-Token header");
}

#[tokio::test]
async fn test_overdue_rejects_unknown_token() {
    let app = app().await;

    let request = Request::get("/invoices/overdue")
        .header("X-Api-Token", "invalid-token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid X-Api-Token");
}

#[tokio::test]
async fn test_overdue_lists_only_own_past_due_open_invoices() {
    let app = app().await;
    let (alpha, beta) = (app.alpha.clone(), app.beta.clone());
    app.invoice(&alpha, "BL_LATE", date(2026, 1, 10), InvoiceStatus::Draft).await;
    app.invoice(&alpha, "BL_LATER", date(2026, 1, 5), InvoiceStatus::Sent).await;
    app.invoice(&alpha, "BL_FUTURE", date(2026, 1, 20), InvoiceStatus::Draft).await;
    app.invoice(&alpha, "BL_SETTLED", date(2026, 1, 1), InvoiceStatus::Paid).await;
    app.invoice(&beta, "BL_OTHER", date(2026, 1, 1), InvoiceStatus::Draft).await;

    let (status, body) = app.send(customer_get("/invoices/overdue", &alpha)).await;

    assert_eq!(status, StatusCode::OK);
    let invoices = body["invoices"].as_array().unwrap();
    let numbers: Vec<&str> = invoices.iter().map(|i| i["bl_number"].as_str().unwrap()).collect();
    assert_eq!(numbers, vec!["BL_LATER", "BL_LATE"]);

    let first = &invoices[0];
    for field in ["bl_number", "amount", "currency", "status", "due_date", "days_overdue"] {
        assert!(first.get(field).is_some(), "missing field {}", field);
    }
    assert_eq!(first["days_overdue"], 10);
    assert_eq!(first["currency"], "USD");
    assert_eq!(first["status"], "sent");
}

#[tokio::test]
async fn test_show_invoice_is_scoped_to_customer() {
    let app = app().await;
    let (alpha, beta) = (app.alpha.clone(), app.beta.clone());
    let id = app.invoice(&alpha, "BL_SHOW", date(2026, 1, 10), InvoiceStatus::Draft).await;

    let (own_status, own) = app.send(customer_get(&format!("/invoices/{}", id), &alpha)).await;
    let (other_status, _) = app.send(customer_get(&format!("/invoices/{}", id), &beta)).await;

    assert_eq!(own_status, StatusCode::OK);
    assert_eq!(own["bl_number"], "BL_SHOW");
    assert_eq!(own["days_overdue"], 5);
    assert_eq!(other_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_requires_admin_token() {
    let app = app().await;

    let (missing, body) = app.send(generate_request(None, r#"{"customer":"CUST001"}"#)).await;
    let (invalid, _) = app
        .send(generate_request(Some("not-a-jwt"), r#"{"customer":"CUST001"}"#))
        .await;

    assert_eq!(missing, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid admin token");
    assert_eq!(invalid, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_generate_requires_generate_role() {
    let app = app().await;
    let token = token_with("invoices:read");

    let (status, body) = app
        .send(generate_request(Some(&token), r#"{"customer":"CUST001"}"#))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Missing permission: invoices:generate");
}

#[tokio::test]
async fn test_generate_requires_customer() {
    let app = app().await;
    let token = token_with(permissions::ADMIN);

    let (empty_body, body) = app.send(generate_request(Some(&token), "")).await;
    let (blank_customer, _) = app
        .send(generate_request(Some(&token), r#"{"customer":"  "}"#))
        .await;

    assert_eq!(empty_body, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "customer identifier is required");
    assert_eq!(blank_customer, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.invoice_count().await, 0);
}

#[tokio::test]
async fn test_generate_rejects_bad_date_and_unknown_customer() {
    let app = app().await;
    let token = token_with(permissions::INVOICES_GENERATE);

    let (bad_date, _) = app
        .send(generate_request(Some(&token), r#"{"customer":"CUST001","date":"11/01/2026"}"#))
        .await;
    let (unknown, _) = app
        .send(generate_request(Some(&token), r#"{"customer":"CUST404"}"#))
        .await;

    assert_eq!(bad_date, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_runs_engine() {
    let app = app().await;
    let alpha = app.alpha.clone();
    app.store
        .create_bill_of_lading(
            BillOfLadingBuilder::new()
                .with_bl_number("BL_HTTP_MIXED")
                .for_customer(alpha.id)
                .with_containers(ContainerFixtures::mixed_four())
                .build_valid(),
        )
        .await
        .unwrap();
    app.store
        .create_bill_of_lading(
            BillOfLadingBuilder::new()
                .with_bl_number("BL_HTTP_EMPTY")
                .for_customer(alpha.id)
                .without_containers()
                .build_valid(),
        )
        .await
        .unwrap();
    let token = token_with(permissions::INVOICES_GENERATE);
    let body = format!(r#"{{"customer_id": {}, "date": "2026-01-11"}}"#, alpha.id.value());

    let (status, summary) = app.send(generate_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["created_count"], 1);
    assert_eq!(summary["skipped_count"], 1);
    assert_eq!(summary["created"][0]["bl_number"], "BL_HTTP_MIXED");
    assert_eq!(summary["created"][0]["status"], "draft");
    assert_eq!(summary["skipped"][0]["reason"], "Bill of lading currently have zero containers");
    let total: rust_decimal::Decimal = summary["total_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(1280));
}
