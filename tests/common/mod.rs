#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use ems_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tower::ServiceExt;
use uuid::Uuid;

/// Application harness backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with a freshly migrated database.
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("ems_test_{}.db", Uuid::new_v4()));

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = ems_api::app_router(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.request(Method::DELETE, uri, None).await
    }

    /// POST that must succeed with 201; returns the `data` payload.
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.post(uri, body).await;
        let status = response.status();
        let json = response_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {json}");
        json["data"].clone()
    }

    pub async fn seed_department(&self, name: &str) -> Value {
        self.create("/api/v1/departments", json!({ "name": name }))
            .await
    }

    pub async fn seed_position(&self, title: &str, department_id: &str, base_salary: &str) -> Value {
        self.create(
            "/api/v1/positions",
            json!({
                "title": title,
                "department_id": department_id,
                "base_salary": base_salary,
            }),
        )
        .await
    }

    /// Employee in a fresh department and position.
    pub async fn seed_employee(&self, code: &str) -> Value {
        let department = self.seed_department(&format!("Dept {code}")).await;
        let position = self
            .seed_position(
                &format!("Role {code}"),
                department["id"].as_str().expect("department id"),
                "3000",
            )
            .await;
        self.create(
            "/api/v1/employees",
            json!({
                "employee_code": code,
                "first_name": "Test",
                "last_name": code,
                "email": format!("{}@example.com", code.to_lowercase()),
                "position_id": position["id"],
                "hire_date": "2024-01-15",
            }),
        )
        .await
    }

    pub async fn seed_product(&self, sku: &str, price: &str, rate: &str, stock: i32) -> Value {
        self.create(
            "/api/v1/products",
            json!({
                "name": format!("Product {sku}"),
                "sku": sku,
                "price": price,
                "commission_rate": rate,
                "stock_quantity": stock,
            }),
        )
        .await
    }

    /// Current balance for an employee as reported by the API.
    pub async fn balance_of(&self, employee_id: &str) -> Decimal {
        let response = self
            .get(&format!("/api/v1/employees/{employee_id}/balance"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        decimal(&json["data"]["current_balance"])
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; accept numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}
