use crate::{
    entities::product_delivery,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_amount, CreatedResult,
        NoContentResult,
    },
    services::deliveries::{CreateDeliveryInput, UpdateDeliveryInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn deliveries_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route(
            "/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        )
        .route("/:id/complete", post(complete_delivery))
        .route("/:id/cancel", post(cancel_delivery))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// pending, completed or cancelled
    pub status: Option<String>,
    /// Created on or after this date
    pub date_from: Option<NaiveDate>,
    /// Created on or before this date
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "quantity": 3,
    "unit_price": "12.50",
    "notes": "Morning route"
}))]
pub struct CreateDeliveryRequest {
    pub product_id: Uuid,
    pub employee_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the product's current price
    #[validate(custom = "validate_amount")]
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<CreateDeliveryRequest> for CreateDeliveryInput {
    fn from(req: CreateDeliveryRequest) -> Self {
        Self {
            product_id: req.product_id,
            employee_id: req.employee_id,
            quantity: req.quantity,
            unit_price: req.unit_price,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryRequest {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_amount")]
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<UpdateDeliveryRequest> for UpdateDeliveryInput {
    fn from(req: UpdateDeliveryRequest) -> Self {
        Self {
            quantity: req.quantity,
            unit_price: req.unit_price,
            notes: req.notes,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries listed", body = ApiResponse<Page<product_delivery::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<product_delivery::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.deliveries.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 201, description = "Delivery created with computed totals", body = ApiResponse<product_delivery::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> CreatedResult<product_delivery::Model> {
    validate_input(&payload)?;
    let delivery = state.services.deliveries.create(payload.into()).await?;
    Ok(created(delivery))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries/:id",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery fetched", body = ApiResponse<product_delivery::Model>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product_delivery::Model> {
    let delivery = state.services.deliveries.get(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/:id",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated", body = ApiResponse<product_delivery::Model>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> ApiResult<product_delivery::Model> {
    validate_input(&payload)?;
    let delivery = state.services.deliveries.update(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries/:id/complete",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery completed and stock decremented", body = ApiResponse<product_delivery::Model>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn complete_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product_delivery::Model> {
    let delivery = state.services.deliveries.complete(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries/:id/cancel",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery cancelled", body = ApiResponse<product_delivery::Model>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn cancel_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product_delivery::Model> {
    let delivery = state.services.deliveries.cancel(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/deliveries/:id",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 204, description = "Delivery deleted"),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Completed deliveries cannot be deleted", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn delete_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.deliveries.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
