//! Payroll generation and attendance tracking through the HTTP API.

mod common;

use axum::http::StatusCode;
use common::{decimal, id_of, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn payroll_net_pay_and_single_payment() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("PAY-001").await;

    let payroll = app
        .create(
            "/api/v1/payrolls",
            json!({
                "employee_id": employee["id"],
                "period_start": "2024-03-01",
                "period_end": "2024-03-31",
                "allowances": "250.50",
                "bonus": "100",
                "deductions": "75.25",
            }),
        )
        .await;

    assert_eq!(decimal(&payroll["basic_salary"]), dec!(3000));
    assert_eq!(decimal(&payroll["net_pay"]), dec!(3275.25));
    assert_eq!(payroll["status"], "pending");

    let payroll_id = id_of(&payroll);
    let paid = app
        .post(&format!("/api/v1/payrolls/{payroll_id}/pay"), json!({}))
        .await;
    assert_eq!(paid.status(), StatusCode::OK);
    let paid = response_json(paid).await;
    assert_eq!(paid["data"]["status"], "paid");
    assert!(!paid["data"]["paid_at"].is_null());

    let twice = app
        .post(&format!("/api/v1/payrolls/{payroll_id}/pay"), json!({}))
        .await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);

    let delete = app.delete(&format!("/api/v1/payrolls/{payroll_id}")).await;
    assert_eq!(delete.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn payroll_rejects_duplicate_period_and_bad_ranges() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("PAY-002").await;
    let body = json!({
        "employee_id": employee["id"],
        "period_start": "2024-04-01",
        "period_end": "2024-04-30",
    });
    app.create("/api/v1/payrolls", body.clone()).await;

    let duplicate = app.post("/api/v1/payrolls", body).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let inverted = app
        .post(
            "/api/v1/payrolls",
            json!({
                "employee_id": employee["id"],
                "period_start": "2024-05-31",
                "period_end": "2024-05-01",
            }),
        )
        .await;
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);

    let overdrawn = app
        .post(
            "/api/v1/payrolls",
            json!({
                "employee_id": employee["id"],
                "period_start": "2024-06-01",
                "period_end": "2024-06-30",
                "deductions": "5000",
            }),
        )
        .await;
    assert_eq!(overdrawn.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_payroll_can_be_deleted() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("PAY-003").await;
    let payroll = app
        .create(
            "/api/v1/payrolls",
            json!({
                "employee_id": employee["id"],
                "period_start": "2024-07-01",
                "period_end": "2024-07-31",
            }),
        )
        .await;

    let response = app
        .delete(&format!("/api/v1/payrolls/{}", id_of(&payroll)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn check_in_status_and_hours_worked() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("ATT-001").await;

    let on_time = app
        .create(
            "/api/v1/attendances/check-in",
            json!({
                "employee_id": employee["id"],
                "check_in": "2024-03-04T08:55:00Z",
            }),
        )
        .await;
    assert_eq!(on_time["status"], "present");
    assert_eq!(on_time["work_date"], "2024-03-04");
    assert!(on_time["check_out"].is_null());

    let attendance_id = id_of(&on_time);
    let closed = app
        .post(
            &format!("/api/v1/attendances/{attendance_id}/check-out"),
            json!({ "check_out": "2024-03-04T17:25:00Z" }),
        )
        .await;
    assert_eq!(closed.status(), StatusCode::OK);
    let closed = response_json(closed).await;
    assert_eq!(decimal(&closed["data"]["hours_worked"]), dec!(8.5));

    let again = app
        .post(
            &format!("/api/v1/attendances/{attendance_id}/check-out"),
            json!({ "check_out": "2024-03-04T18:00:00Z" }),
        )
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let late = app
        .create(
            "/api/v1/attendances/check-in",
            json!({
                "employee_id": employee["id"],
                "check_in": "2024-03-05T09:30:00Z",
            }),
        )
        .await;
    assert_eq!(late["status"], "late");

    let late_only = response_json(
        app.get(&format!(
            "/api/v1/attendances?employee_id={}&status=late",
            id_of(&employee)
        ))
        .await,
    )
    .await;
    assert_eq!(late_only["data"]["total"], 1);
}

#[tokio::test]
async fn one_check_in_per_day() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("ATT-002").await;
    let body = json!({
        "employee_id": employee["id"],
        "check_in": "2024-03-06T08:00:00Z",
    });
    app.create("/api/v1/attendances/check-in", body).await;

    let second = app
        .post(
            "/api/v1/attendances/check-in",
            json!({
                "employee_id": employee["id"],
                "check_in": "2024-03-06T13:00:00Z",
            }),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn check_out_before_check_in_is_rejected() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("ATT-003").await;
    let record = app
        .create(
            "/api/v1/attendances/check-in",
            json!({
                "employee_id": employee["id"],
                "check_in": "2024-03-07T10:00:00Z",
            }),
        )
        .await;

    let response = app
        .post(
            &format!("/api/v1/attendances/{}/check-out", id_of(&record)),
            json!({ "check_out": "2024-03-07T09:00:00Z" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
