//! Products, deliveries, collections, expenses and the balance sheets they move.

mod common;

use axum::http::StatusCode;
use common::{decimal, id_of, response_json, TestApp};
use ems_api::entities::balance_sheet;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

#[tokio::test]
async fn delivery_computes_commission_and_completes_once() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("DLV-001").await;
    let product = app.seed_product("WF-100", "12.50", "7.5", 10).await;

    let delivery = app
        .create(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee["id"],
                "quantity": 4,
            }),
        )
        .await;
    assert_eq!(decimal(&delivery["unit_price"]), dec!(12.50));
    assert_eq!(decimal(&delivery["total_amount"]), dec!(50));
    assert_eq!(decimal(&delivery["commission_amount"]), dec!(3.75));
    assert_eq!(delivery["status"], "pending");

    let delivery_id = id_of(&delivery);
    let completed = app
        .post(&format!("/api/v1/deliveries/{delivery_id}/complete"), json!({}))
        .await;
    assert_eq!(completed.status(), StatusCode::OK);
    let completed = response_json(completed).await;
    assert_eq!(completed["data"]["status"], "completed");
    assert!(!completed["data"]["delivered_at"].is_null());

    let stock = response_json(
        app.get(&format!("/api/v1/products/{}", id_of(&product)))
            .await,
    )
    .await;
    assert_eq!(stock["data"]["stock_quantity"], 6);

    let twice = app
        .post(&format!("/api/v1/deliveries/{delivery_id}/complete"), json!({}))
        .await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);

    let stock = response_json(
        app.get(&format!("/api/v1/products/{}", id_of(&product)))
            .await,
    )
    .await;
    assert_eq!(stock["data"]["stock_quantity"], 6, "stock must move once");

    let cancel = app
        .post(&format!("/api/v1/deliveries/{delivery_id}/cancel"), json!({}))
        .await;
    assert_eq!(cancel.status(), StatusCode::CONFLICT);
    let delete = app.delete(&format!("/api/v1/deliveries/{delivery_id}")).await;
    assert_eq!(delete.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn completing_past_available_stock_goes_negative() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("DLV-002").await;
    let product = app.seed_product("WF-200", "2", "0", 2).await;

    let delivery = app
        .create(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee["id"],
                "quantity": 5,
            }),
        )
        .await;
    let response = app
        .post(
            &format!("/api/v1/deliveries/{}/complete", id_of(&delivery)),
            json!({}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stock = response_json(
        app.get(&format!("/api/v1/products/{}", id_of(&product)))
            .await,
    )
    .await;
    assert_eq!(stock["data"]["stock_quantity"], -3);
}

#[tokio::test]
async fn pending_delivery_can_be_edited_cancelled_and_deleted() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("DLV-003").await;
    let product = app.seed_product("WF-300", "10", "12.5", 50).await;

    let delivery = app
        .create(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee["id"],
                "quantity": 1,
                "unit_price": "8",
            }),
        )
        .await;
    let delivery_id = id_of(&delivery);

    let updated = app
        .put(
            &format!("/api/v1/deliveries/{delivery_id}"),
            json!({ "quantity": 3 }),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = response_json(updated).await;
    assert_eq!(decimal(&updated["data"]["total_amount"]), dec!(24));
    assert_eq!(decimal(&updated["data"]["commission_amount"]), dec!(3));

    let cancelled = app
        .post(&format!("/api/v1/deliveries/{delivery_id}/cancel"), json!({}))
        .await;
    assert_eq!(cancelled.status(), StatusCode::OK);

    let complete = app
        .post(&format!("/api/v1/deliveries/{delivery_id}/complete"), json!({}))
        .await;
    assert_eq!(complete.status(), StatusCode::CONFLICT);

    let deleted = app.delete(&format!("/api/v1/deliveries/{delivery_id}")).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let product_delete = app
        .delete(&format!("/api/v1/products/{}", id_of(&product)))
        .await;
    assert_eq!(product_delete.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn product_with_deliveries_cannot_be_deleted() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("DLV-004").await;
    let product = app.seed_product("WF-400", "1", "0", 1).await;
    app.create(
        "/api/v1/deliveries",
        json!({
            "product_id": product["id"],
            "employee_id": employee["id"],
            "quantity": 1,
        }),
    )
    .await;

    let response = app
        .delete(&format!("/api/v1/products/{}", id_of(&product)))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_sku_conflicts() {
    let app = TestApp::new().await;
    app.seed_product("DUP-1", "1", "0", 0).await;
    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "Again", "sku": "DUP-1", "price": "2" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn expenses_debit_and_restore_balance() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("EXP-001").await;
    let employee_id = id_of(&employee);
    assert_eq!(app.balance_of(&employee_id).await, Decimal::ZERO);

    let expense = app
        .create(
            "/api/v1/expenses",
            json!({
                "employee_id": employee_id,
                "category": "fuel",
                "amount": "42.75",
                "expense_date": "2024-03-04",
            }),
        )
        .await;
    assert_eq!(app.balance_of(&employee_id).await, dec!(-42.75));

    let expense_id = id_of(&expense);
    let updated = app
        .put(
            &format!("/api/v1/expenses/{expense_id}"),
            json!({ "amount": "50" }),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(app.balance_of(&employee_id).await, dec!(-50));

    let deleted = app.delete(&format!("/api/v1/expenses/{expense_id}")).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.balance_of(&employee_id).await, Decimal::ZERO);
}

#[tokio::test]
async fn moving_an_expense_rebalances_both_employees() {
    let app = TestApp::new().await;
    let first = id_of(&app.seed_employee("EXP-010").await);
    let second = id_of(&app.seed_employee("EXP-011").await);

    let expense = app
        .create(
            "/api/v1/expenses",
            json!({
                "employee_id": first,
                "category": "meals",
                "amount": "20.25",
                "expense_date": "2024-03-04",
            }),
        )
        .await;

    let response = app
        .put(
            &format!("/api/v1/expenses/{}", id_of(&expense)),
            json!({ "employee_id": second, "amount": "30.5" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.balance_of(&first).await, Decimal::ZERO);
    assert_eq!(app.balance_of(&second).await, dec!(-30.5));
}

#[tokio::test]
async fn non_positive_expense_is_rejected() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("EXP-020").await;
    let response = app
        .post(
            "/api/v1/expenses",
            json!({
                "employee_id": employee["id"],
                "category": "fuel",
                "amount": "0",
                "expense_date": "2024-03-04",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collections_credit_balance_and_reverse_on_delete() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("COL-001").await;
    let employee_id = id_of(&employee);
    let product = app.seed_product("COL-P", "12.5", "0", 10).await;
    let delivery = app
        .create(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee_id,
                "quantity": 3,
            }),
        )
        .await;

    let collection = app
        .create(
            "/api/v1/collections",
            json!({
                "employee_id": employee_id,
                "delivery_id": delivery["id"],
                "amount": "37.50",
                "collected_on": "2024-03-04",
                "method": "Cash",
            }),
        )
        .await;
    assert_eq!(collection["method"], "cash");
    assert_eq!(app.balance_of(&employee_id).await, dec!(37.5));

    let by_method = response_json(app.get("/api/v1/collections?method=CASH").await).await;
    assert_eq!(by_method["data"]["total"], 1);

    let deleted = app
        .delete(&format!("/api/v1/collections/{}", id_of(&collection)))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.balance_of(&employee_id).await, Decimal::ZERO);
}

#[tokio::test]
async fn collection_for_someone_elses_delivery_is_rejected() {
    let app = TestApp::new().await;
    let owner = app.seed_employee("COL-010").await;
    let other = app.seed_employee("COL-011").await;
    let product = app.seed_product("COL-Q", "5", "0", 10).await;
    let delivery = app
        .create(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": owner["id"],
                "quantity": 1,
            }),
        )
        .await;

    let response = app
        .post(
            "/api/v1/collections",
            json!({
                "employee_id": other["id"],
                "delivery_id": delivery["id"],
                "amount": "5",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.balance_of(&id_of(&other)).await, Decimal::ZERO);
}

#[tokio::test]
async fn manual_adjustment_and_balance_listing() {
    let app = TestApp::new().await;
    let rich = id_of(&app.seed_employee("BAL-001").await);
    let poor = id_of(&app.seed_employee("BAL-002").await);

    for (employee_id, amount) in [(&rich, "100.25"), (&poor, "-15")] {
        let response = app
            .post(
                "/api/v1/balance-sheets/adjust",
                json!({
                    "employee_id": employee_id,
                    "amount": amount,
                    "reason": "Opening balance",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.balance_of(&rich).await, dec!(100.25));

    let sheets = response_json(app.get("/api/v1/balance-sheets").await).await;
    let items = sheets["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["employee_id"].as_str(), Some(rich.as_str()));

    let negative = response_json(app.get("/api/v1/balance-sheets?max_balance=0").await).await;
    assert_eq!(negative["data"]["total"], 1);

    let zero = app
        .post(
            "/api/v1/balance-sheets/adjust",
            json!({ "employee_id": rich, "amount": "0", "reason": "noop" }),
        )
        .await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_not_overflowed() {
    let app = TestApp::new().await;
    let employee = app.seed_employee("BIG-001").await;
    let product = app.seed_product("BIG-P", "1000", "10", 0).await;

    let huge_price = app
        .post(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee["id"],
                "quantity": i32::MAX,
                "unit_price": "79228162514264337593543950",
            }),
        )
        .await;
    assert_eq!(huge_price.status(), StatusCode::BAD_REQUEST);

    // Each factor fits its column, the product does not
    let huge_total = app
        .post(
            "/api/v1/deliveries",
            json!({
                "product_id": product["id"],
                "employee_id": employee["id"],
                "quantity": i32::MAX,
            }),
        )
        .await;
    assert_eq!(huge_total.status(), StatusCode::BAD_REQUEST);

    let product_price = app
        .post(
            "/api/v1/products",
            json!({ "name": "Gold", "sku": "BIG-Q", "price": "1000000000000" }),
        )
        .await;
    assert_eq!(product_price.status(), StatusCode::BAD_REQUEST);

    let listed = response_json(
        app.get(&format!("/api/v1/deliveries?employee_id={}", id_of(&employee)))
            .await,
    )
    .await;
    assert_eq!(listed["data"]["total"], 0);
}

#[tokio::test]
async fn invalid_request_bodies_report_field_details() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "Widget", "sku": "DET-1", "price": "-1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Validation failed");
    let details = body["details"].as_str().expect("field details");
    assert!(details.contains("price"), "details were: {details}");
}

#[tokio::test]
async fn concurrent_expenses_for_a_new_employee_all_land() {
    let app = TestApp::new().await;
    let employee_id = id_of(&app.seed_employee("RACE-001").await);

    let requests = (0..4).map(|_| {
        app.post(
            "/api/v1/expenses",
            json!({
                "employee_id": employee_id,
                "category": "fuel",
                "amount": "1.25",
                "expense_date": "2024-03-04",
            }),
        )
    });
    let statuses: Vec<StatusCode> = join_all(requests)
        .await
        .into_iter()
        .map(|response| response.status())
        .collect();
    assert_eq!(statuses, vec![StatusCode::CREATED; 4]);

    assert_eq!(app.balance_of(&employee_id).await, dec!(-5));
    let sheets = response_json(
        app.get(&format!("/api/v1/balance-sheets?employee_id={employee_id}"))
            .await,
    )
    .await;
    assert_eq!(sheets["data"]["total"], 1);
}

#[tokio::test]
async fn concurrent_balance_writes_are_not_lost() {
    let app = TestApp::new().await;
    let employee_id = id_of(&app.seed_employee("RACE-002").await);

    let adjustments = (0..3).map(|_| {
        app.post(
            "/api/v1/balance-sheets/adjust",
            json!({ "employee_id": employee_id, "amount": "10.5", "reason": "bonus" }),
        )
    });
    let expenses = (0..3).map(|_| {
        app.post(
            "/api/v1/expenses",
            json!({
                "employee_id": employee_id,
                "category": "meals",
                "amount": "0.25",
                "expense_date": "2024-03-05",
            }),
        )
    });
    let (adjusted, spent) = tokio::join!(join_all(adjustments), join_all(expenses));
    assert!(adjusted.iter().all(|r| r.status() == StatusCode::OK));
    assert!(spent.iter().all(|r| r.status() == StatusCode::CREATED));

    assert_eq!(app.balance_of(&employee_id).await, dec!(30.75));
}

async fn drop_balance_sheets(app: &TestApp) {
    balance_sheet::Entity::delete_many()
        .exec(&*app.state.db)
        .await
        .expect("clear balance sheets");
}

async fn sheet_count(app: &TestApp, employee_id: &str) -> u64 {
    let sheets = response_json(
        app.get(&format!("/api/v1/balance-sheets?employee_id={employee_id}"))
            .await,
    )
    .await;
    sheets["data"]["total"].as_u64().expect("total")
}

#[tokio::test]
async fn deleting_an_expense_without_a_sheet_opens_none() {
    let app = TestApp::new().await;
    let employee_id = id_of(&app.seed_employee("NOS-001").await);
    let expense = app
        .create(
            "/api/v1/expenses",
            json!({
                "employee_id": employee_id,
                "category": "fuel",
                "amount": "8",
                "expense_date": "2024-03-04",
            }),
        )
        .await;
    drop_balance_sheets(&app).await;

    let deleted = app
        .delete(&format!("/api/v1/expenses/{}", id_of(&expense)))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(sheet_count(&app, &employee_id).await, 0);
}

#[tokio::test]
async fn deleting_a_collection_without_a_sheet_opens_none() {
    let app = TestApp::new().await;
    let employee_id = id_of(&app.seed_employee("NOS-002").await);
    let collection = app
        .create(
            "/api/v1/collections",
            json!({ "employee_id": employee_id, "amount": "12.5" }),
        )
        .await;
    drop_balance_sheets(&app).await;

    let deleted = app
        .delete(&format!("/api/v1/collections/{}", id_of(&collection)))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(sheet_count(&app, &employee_id).await, 0);
}
