use crate::{
    entities::collection,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_not_blank, validate_positive_amount,
        CreatedResult, NoContentResult,
    },
    services::collections::RecordCollectionInput,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn collections_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).post(record_collection))
        .route("/:id", get(get_collection).delete(delete_collection))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CollectionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub delivery_id: Option<Uuid>,
    /// Payment method, e.g. cash or transfer
    pub method: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn default_method() -> String {
    "cash".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "delivery_id": "0c3e8d1f-5a6b-4c7d-9e8f-1a2b3c4d5e6f",
    "amount": "37.50",
    "collected_on": "2024-03-04",
    "method": "cash"
}))]
pub struct RecordCollectionRequest {
    pub employee_id: Uuid,
    pub delivery_id: Option<Uuid>,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
    /// Defaults to today
    pub collected_on: Option<NaiveDate>,
    #[serde(default = "default_method")]
    #[validate(length(min = 1, max = 32), custom = "validate_not_blank")]
    pub method: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<RecordCollectionRequest> for RecordCollectionInput {
    fn from(req: RecordCollectionRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            delivery_id: req.delivery_id,
            amount: req.amount,
            collected_on: req
                .collected_on
                .unwrap_or_else(|| Utc::now().date_naive()),
            method: req.method,
            notes: req.notes,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/collections",
    params(CollectionListQuery),
    responses(
        (status = 200, description = "Collections listed", body = ApiResponse<Page<collection::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn list_collections(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<collection::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.collections.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/collections",
    request_body = RecordCollectionRequest,
    responses(
        (status = 201, description = "Collection recorded and balance credited", body = ApiResponse<collection::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Employee or delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn record_collection(
    State(state): State<AppState>,
    Json(payload): Json<RecordCollectionRequest>,
) -> CreatedResult<collection::Model> {
    validate_input(&payload)?;
    let collection = state.services.collections.record(payload.into()).await?;
    Ok(created(collection))
}

#[utoipa::path(
    get,
    path = "/api/v1/collections/:id",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection fetched", body = ApiResponse<collection::Model>),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<collection::Model> {
    let collection = state.services.collections.get(id).await?;
    Ok(Json(ApiResponse::success(collection)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/collections/:id",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted and balance reversed"),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "collections"
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.collections.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
