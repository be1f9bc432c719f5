use crate::{
    entities::position,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_amount, validate_not_blank,
        CreatedResult, NoContentResult,
    },
    services::positions::PositionInput,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn positions_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_positions).post(create_position))
        .route(
            "/:id",
            get(get_position).put(update_position).delete(delete_position),
        )
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PositionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches title or description
    pub search: Option<String>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "title": "Senior Sales Representative",
    "department_id": "550e8400-e29b-41d4-a716-446655440000",
    "base_salary": "4200.00"
}))]
pub struct PositionRequest {
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub title: String,
    pub department_id: Option<Uuid>,
    #[validate(custom = "validate_amount")]
    pub base_salary: Decimal,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<PositionRequest> for PositionInput {
    fn from(req: PositionRequest) -> Self {
        Self {
            title: req.title,
            department_id: req.department_id,
            base_salary: req.base_salary,
            description: req.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/positions",
    params(PositionListQuery),
    responses(
        (status = 200, description = "Positions listed", body = ApiResponse<Page<position::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "positions"
)]
pub async fn list_positions(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<position::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.positions.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/positions",
    request_body = PositionRequest,
    responses(
        (status = 201, description = "Position created", body = ApiResponse<position::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    tag = "positions"
)]
pub async fn create_position(
    State(state): State<AppState>,
    Json(payload): Json<PositionRequest>,
) -> CreatedResult<position::Model> {
    validate_input(&payload)?;
    let position = state.services.positions.create(payload.into()).await?;
    Ok(created(position))
}

#[utoipa::path(
    get,
    path = "/api/v1/positions/:id",
    params(("id" = Uuid, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position fetched", body = ApiResponse<position::Model>),
        (status = 404, description = "Position not found", body = crate::errors::ErrorResponse)
    ),
    tag = "positions"
)]
pub async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<position::Model> {
    let position = state.services.positions.get(id).await?;
    Ok(Json(ApiResponse::success(position)))
}

#[utoipa::path(
    put,
    path = "/api/v1/positions/:id",
    params(("id" = Uuid, Path, description = "Position ID")),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Position updated", body = ApiResponse<position::Model>),
        (status = 404, description = "Position not found", body = crate::errors::ErrorResponse)
    ),
    tag = "positions"
)]
pub async fn update_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PositionRequest>,
) -> ApiResult<position::Model> {
    validate_input(&payload)?;
    let position = state.services.positions.update(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(position)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/positions/:id",
    params(("id" = Uuid, Path, description = "Position ID")),
    responses(
        (status = 204, description = "Position deleted"),
        (status = 404, description = "Position not found", body = crate::errors::ErrorResponse)
    ),
    tag = "positions"
)]
pub async fn delete_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.positions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
