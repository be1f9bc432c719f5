//! Departments, positions and employees through the HTTP API.

mod common;

use axum::http::StatusCode;
use common::{decimal, id_of, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn employee_inherits_salary_and_department_from_position() {
    let app = TestApp::new().await;
    let department = app.seed_department("Field Sales").await;
    let position = app
        .seed_position("Sales Rep", &id_of(&department), "2500.50")
        .await;

    let employee = app
        .create(
            "/api/v1/employees",
            json!({
                "employee_code": "EMP-001",
                "first_name": "Ada",
                "last_name": "Okafor",
                "email": "Ada.Okafor@Example.com",
                "position_id": position["id"],
                "hire_date": "2023-05-01",
            }),
        )
        .await;

    assert_eq!(decimal(&employee["salary"]), dec!(2500.50));
    assert_eq!(employee["department_id"], department["id"]);
    assert_eq!(employee["full_name"], "Ada Okafor");
    assert_eq!(employee["email"], "ada.okafor@example.com");
    assert_eq!(employee["status"], "active");
    assert_eq!(employee["is_active"], true);
}

#[tokio::test]
async fn duplicate_employee_code_conflicts() {
    let app = TestApp::new().await;
    app.seed_employee("EMP-100").await;

    let response = app
        .post(
            "/api/v1/employees",
            json!({
                "employee_code": "EMP-100",
                "first_name": "Other",
                "last_name": "Person",
                "email": "other@example.com",
                "hire_date": "2024-01-01",
                "salary": "1000",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_payload_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/employees",
            json!({
                "employee_code": "EMP-X",
                "first_name": "No",
                "last_name": "Email",
                "email": "not-an-email",
                "hire_date": "2024-01-01",
                "salary": "1000",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn unknown_employee_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .get("/api/v1/employees/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn promotion_records_history_and_moves_employee() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("EMP-200").await;
    let employee_id = id_of(&employee);
    let old_position = employee["position_id"].clone();

    let management = app.seed_department("Management").await;
    let manager = app
        .seed_position("Area Manager", &id_of(&management), "5000")
        .await;

    let response = app
        .post(
            &format!("/api/v1/employees/{employee_id}/promote"),
            json!({
                "to_position_id": manager["id"],
                "effective_date": "2024-04-01",
                "notes": "Annual review",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let promoted = &body["data"]["employee"];
    let promotion = &body["data"]["promotion"];

    assert_eq!(promoted["position_id"], manager["id"]);
    assert_eq!(promoted["department_id"], management["id"]);
    assert_eq!(decimal(&promoted["salary"]), dec!(5000));
    assert_eq!(promotion["from_position_id"], old_position);
    assert_eq!(decimal(&promotion["previous_salary"]), dec!(3000));
    assert_eq!(decimal(&promotion["new_salary"]), dec!(5000));

    let history = response_json(
        app.get(&format!("/api/v1/employees/{employee_id}/promotions"))
            .await,
    )
    .await;
    assert_eq!(history["data"].as_array().map(Vec::len), Some(1));

    let again = app
        .post(
            &format!("/api/v1/employees/{employee_id}/promote"),
            json!({ "to_position_id": manager["id"] }),
        )
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn terminated_employee_cannot_be_promoted() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("EMP-300").await;
    let employee_id = id_of(&employee);

    let response = app
        .put(
            &format!("/api/v1/employees/{employee_id}"),
            json!({ "status": "terminated" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let department = app.seed_department("Elsewhere").await;
    let position = app
        .seed_position("Elsewhere Role", &id_of(&department), "100")
        .await;
    let response = app
        .post(
            &format!("/api/v1/employees/{employee_id}/promote"),
            json!({ "to_position_id": position["id"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_filters_ignore_unknown_and_reject_malformed() {
    let app = TestApp::new().await;
    let first = app.seed_employee("EMP-401").await;
    app.seed_employee("EMP-402").await;

    let all = response_json(app.get("/api/v1/employees?colour=blue").await).await;
    assert_eq!(all["data"]["total"], 2);

    let by_department = response_json(
        app.get(&format!(
            "/api/v1/employees?department_id={}",
            first["department_id"].as_str().unwrap()
        ))
        .await,
    )
    .await;
    assert_eq!(by_department["data"]["total"], 1);
    assert_eq!(by_department["data"]["items"][0]["id"], first["id"]);

    let by_search = response_json(app.get("/api/v1/employees?search=EMP-402").await).await;
    assert_eq!(by_search["data"]["total"], 1);

    let malformed = app.get("/api/v1/employees?department_id=nope").await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let bad_status = app.get("/api/v1/employees?status=retired").await;
    assert_eq!(bad_status.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pagination_reports_totals() {
    let app = TestApp::new().await;
    for name in ["Alpha", "Bravo", "Charlie"] {
        app.seed_department(name).await;
    }

    let page = response_json(app.get("/api/v1/departments?page=2&per_page=2").await).await;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["total_pages"], 2);
    assert_eq!(page["data"]["page"], 2);
    assert_eq!(page["data"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn deleting_department_detaches_employees() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("EMP-500").await;
    let department_id = employee["department_id"].as_str().unwrap().to_string();

    let response = app
        .delete(&format!("/api/v1/departments/{department_id}"))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let reloaded = response_json(
        app.get(&format!("/api/v1/employees/{}", id_of(&employee)))
            .await,
    )
    .await;
    assert!(reloaded["data"]["department_id"].is_null());
}

#[tokio::test]
async fn duplicate_department_name_conflicts() {
    let app = TestApp::new().await;
    app.seed_department("Logistics").await;
    let response = app
        .post("/api/v1/departments", json!({ "name": "Logistics" }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_an_employee_removes_their_ledger() {
    let app = TestApp::new().await;
    let employee_id = id_of(&app.seed_employee("GONE-001").await);
    let keeper_id = id_of(&app.seed_employee("GONE-002").await);
    let product = app.seed_product("GONE-P", "4", "0", 10).await;

    for owner in [&employee_id, &keeper_id] {
        app.create(
            "/api/v1/expenses",
            json!({
                "employee_id": owner,
                "category": "fuel",
                "amount": "6.5",
                "expense_date": "2024-03-04",
            }),
        )
        .await;
        app.create(
            "/api/v1/deliveries",
            json!({ "product_id": product["id"], "employee_id": owner, "quantity": 2 }),
        )
        .await;
    }
    app.create(
        "/api/v1/collections",
        json!({ "employee_id": employee_id, "amount": "8" }),
    )
    .await;

    let deleted = app.delete(&format!("/api/v1/employees/{employee_id}")).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    for resource in ["expenses", "deliveries", "collections", "balance-sheets"] {
        let gone = response_json(
            app.get(&format!("/api/v1/{resource}?employee_id={employee_id}"))
                .await,
        )
        .await;
        assert_eq!(gone["data"]["total"], 0, "{resource} left behind");

        let kept = response_json(
            app.get(&format!("/api/v1/{resource}?employee_id={keeper_id}"))
                .await,
        )
        .await;
        let expected = if resource == "collections" { 0 } else { 1 };
        assert_eq!(kept["data"]["total"], expected, "{resource} of another employee");
    }

    let balance = app
        .get(&format!("/api/v1/employees/{employee_id}/balance"))
        .await;
    assert_eq!(balance.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.balance_of(&keeper_id).await, dec!(-6.5));
}
