//! Warehouses, per-warehouse inventory and stock transfers.

mod common;

use axum::http::StatusCode;
use common::{id_of, response_json, TestApp};
use serde_json::{json, Value};

async fn seed_warehouse(app: &TestApp, name: &str, code: &str) -> Value {
    app.create(
        "/api/v1/warehouses",
        json!({ "name": name, "code": code, "location": "Lagos" }),
    )
    .await
}

async fn stock_in(app: &TestApp, warehouse_id: &str, product_id: &str) -> i64 {
    let body = response_json(
        app.get(&format!("/api/v1/warehouses/{warehouse_id}/inventory"))
            .await,
    )
    .await;
    body["data"]
        .as_array()
        .expect("inventory lines")
        .iter()
        .find(|line| line["product_id"].as_str() == Some(product_id))
        .and_then(|line| line["quantity"].as_i64())
        .unwrap_or(0)
}

#[tokio::test]
async fn warehouse_codes_are_uppercased_and_unique() {
    let app = TestApp::new().await;
    let warehouse = seed_warehouse(&app, "Main", "main-01").await;
    assert_eq!(warehouse["code"], "MAIN-01");

    let duplicate = app
        .post(
            "/api/v1/warehouses",
            json!({ "name": "Copy", "code": "Main-01" }),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn transfer_moves_stock_and_conserves_total() {
    let app = TestApp::new().await;
    let product = app.seed_product("WH-1", "4", "0", 0).await;
    let product_id = id_of(&product);
    let main = id_of(&seed_warehouse(&app, "Main", "MAIN").await);
    let branch = id_of(&seed_warehouse(&app, "Branch", "BRANCH").await);

    let set = app
        .put(
            &format!("/api/v1/warehouses/{main}/inventory"),
            json!({ "product_id": product_id, "quantity": 40 }),
        )
        .await;
    assert_eq!(set.status(), StatusCode::OK);

    let transfer = app
        .create(
            "/api/v1/stock-transfers",
            json!({
                "product_id": product_id,
                "from_warehouse_id": main,
                "to_warehouse_id": branch,
                "quantity": 15,
            }),
        )
        .await;
    assert_eq!(transfer["quantity"], 15);

    let in_main = stock_in(&app, &main, &product_id).await;
    let in_branch = stock_in(&app, &branch, &product_id).await;
    assert_eq!((in_main, in_branch), (25, 15));
    assert_eq!(in_main + in_branch, 40);

    let fetched = app
        .get(&format!("/api/v1/stock-transfers/{}", id_of(&transfer)))
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let for_branch = response_json(
        app.get(&format!("/api/v1/stock-transfers?warehouse_id={branch}"))
            .await,
    )
    .await;
    assert_eq!(for_branch["data"]["total"], 1);
}

#[tokio::test]
async fn transfer_beyond_available_stock_is_rejected() {
    let app = TestApp::new().await;
    let product_id = id_of(&app.seed_product("WH-2", "4", "0", 0).await);
    let main = id_of(&seed_warehouse(&app, "Main", "M1").await);
    let branch = id_of(&seed_warehouse(&app, "Branch", "B1").await);
    app.put(
        &format!("/api/v1/warehouses/{main}/inventory"),
        json!({ "product_id": product_id, "quantity": 5 }),
    )
    .await;

    let response = app
        .post(
            "/api/v1/stock-transfers",
            json!({
                "product_id": product_id,
                "from_warehouse_id": main,
                "to_warehouse_id": branch,
                "quantity": 6,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(stock_in(&app, &main, &product_id).await, 5);
    assert_eq!(stock_in(&app, &branch, &product_id).await, 0);
}

#[tokio::test]
async fn transfer_to_same_warehouse_is_rejected() {
    let app = TestApp::new().await;
    let product_id = id_of(&app.seed_product("WH-3", "4", "0", 0).await);
    let main = id_of(&seed_warehouse(&app, "Main", "M2").await);

    let response = app
        .post(
            "/api/v1/stock-transfers",
            json!({
                "product_id": product_id,
                "from_warehouse_id": main,
                "to_warehouse_id": main,
                "quantity": 1,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn warehouse_with_transfers_is_kept() {
    let app = TestApp::new().await;
    let product_id = id_of(&app.seed_product("WH-4", "4", "0", 0).await);
    let main = id_of(&seed_warehouse(&app, "Main", "M3").await);
    let branch = id_of(&seed_warehouse(&app, "Branch", "B3").await);
    let spare = id_of(&seed_warehouse(&app, "Spare", "S3").await);
    app.put(
        &format!("/api/v1/warehouses/{main}/inventory"),
        json!({ "product_id": product_id, "quantity": 2 }),
    )
    .await;
    app.create(
        "/api/v1/stock-transfers",
        json!({
            "product_id": product_id,
            "from_warehouse_id": main,
            "to_warehouse_id": branch,
            "quantity": 2,
        }),
    )
    .await;

    let blocked = app.delete(&format!("/api/v1/warehouses/{main}")).await;
    assert_eq!(blocked.status(), StatusCode::CONFLICT);

    let removed = app.delete(&format!("/api/v1/warehouses/{spare}")).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    let gone = app.get(&format!("/api/v1/warehouses/{spare}")).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_inventory_is_rejected() {
    let app = TestApp::new().await;
    let product_id = id_of(&app.seed_product("WH-5", "4", "0", 0).await);
    let main = id_of(&seed_warehouse(&app, "Main", "M4").await);

    let response = app
        .put(
            &format!("/api/v1/warehouses/{main}/inventory"),
            json!({ "product_id": product_id, "quantity": -1 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
