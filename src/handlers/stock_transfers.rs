use crate::{
    entities::stock_transfer,
    filters::{Page, QueryParams},
    handlers::common::{created, pagination, validate_input, CreatedResult},
    services::warehouses::TransferStockInput,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn stock_transfers_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/:id", get(get_transfer))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockTransferListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub product_id: Option<Uuid>,
    /// Matches either the source or the destination warehouse
    pub warehouse_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "from_warehouse_id": "3f1e2d3c-4b5a-4968-8776-655443322110",
    "to_warehouse_id": "9a8b7c6d-5e4f-4a3b-2c1d-0e9f8a7b6c5d",
    "quantity": 10
}))]
pub struct TransferStockRequest {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the time of the request
    pub transferred_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<TransferStockRequest> for TransferStockInput {
    fn from(req: TransferStockRequest) -> Self {
        Self {
            product_id: req.product_id,
            from_warehouse_id: req.from_warehouse_id,
            to_warehouse_id: req.to_warehouse_id,
            quantity: req.quantity,
            transferred_at: req.transferred_at,
            notes: req.notes,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-transfers",
    params(StockTransferListQuery),
    responses(
        (status = 200, description = "Transfers listed, newest first", body = ApiResponse<Page<stock_transfer::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<stock_transfer::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state
        .services
        .warehouses
        .list_transfers(&params, pagination)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-transfers",
    request_body = TransferStockRequest,
    responses(
        (status = 201, description = "Stock moved between warehouses", body = ApiResponse<stock_transfer::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse or product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at source", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(payload): Json<TransferStockRequest>,
) -> CreatedResult<stock_transfer::Model> {
    validate_input(&payload)?;
    let transfer = state.services.warehouses.transfer(payload.into()).await?;
    Ok(created(transfer))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-transfers/:id",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer fetched", body = ApiResponse<stock_transfer::Model>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<stock_transfer::Model> {
    let transfer = state.services.warehouses.get_transfer(id).await?;
    Ok(Json(ApiResponse::success(transfer)))
}
