use crate::{
    entities::{warehouse, warehouse_inventory},
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_not_blank, CreatedResult,
        NoContentResult,
    },
    services::warehouses::{InventoryLine, SetInventoryInput, WarehouseInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn warehouses_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route(
            "/:id",
            get(get_warehouse)
                .put(update_warehouse)
                .delete(delete_warehouse),
        )
        .route("/:id/inventory", get(get_inventory).put(set_inventory))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name, code or location
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "North Depot",
    "code": "NDP",
    "location": "12 Harbour Road"
}))]
pub struct WarehouseRequest {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    /// Stored uppercase
    #[validate(length(min = 1, max = 32), custom = "validate_not_blank")]
    pub code: String,
    #[validate(length(max = 500))]
    pub location: Option<String>,
}

impl From<WarehouseRequest> for WarehouseInput {
    fn from(req: WarehouseRequest) -> Self {
        Self {
            name: req.name,
            code: req.code,
            location: req.location,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "quantity": 40
}))]
pub struct SetInventoryRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(WarehouseListQuery),
    responses(
        (status = 200, description = "Warehouses listed", body = ApiResponse<Page<warehouse::Model>>)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<warehouse::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.warehouses.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = WarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = ApiResponse<warehouse::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<WarehouseRequest>,
) -> CreatedResult<warehouse::Model> {
    validate_input(&payload)?;
    let warehouse = state.services.warehouses.create(payload.into()).await?;
    Ok(created(warehouse))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse fetched", body = ApiResponse<warehouse::Model>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<warehouse::Model> {
    let warehouse = state.services.warehouses.get(id).await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = WarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = ApiResponse<warehouse::Model>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WarehouseRequest>,
) -> ApiResult<warehouse::Model> {
    validate_input(&payload)?;
    let warehouse = state
        .services
        .warehouses
        .update(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Warehouse has transfer history", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.warehouses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/:id/inventory",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Stock held in the warehouse", body = ApiResponse<Vec<InventoryLine>>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<InventoryLine>> {
    let lines = state.services.warehouses.inventory(id).await?;
    Ok(Json(ApiResponse::success(lines)))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/:id/inventory",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = SetInventoryRequest,
    responses(
        (status = 200, description = "Inventory level set", body = ApiResponse<warehouse_inventory::Model>),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn set_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetInventoryRequest>,
) -> ApiResult<warehouse_inventory::Model> {
    validate_input(&payload)?;
    let line = state
        .services
        .warehouses
        .set_inventory(
            id,
            SetInventoryInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(line)))
}
