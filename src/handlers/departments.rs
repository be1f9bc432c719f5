use crate::{
    entities::department,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_not_blank, CreatedResult, NoContentResult,
    },
    services::departments::DepartmentInput,
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

pub fn departments_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/:id",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DepartmentListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name or description
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Field Sales",
    "description": "Route sales and deliveries"
}))]
pub struct DepartmentRequest {
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<DepartmentRequest> for DepartmentInput {
    fn from(req: DepartmentRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    params(DepartmentListQuery),
    responses(
        (status = 200, description = "Departments listed", body = ApiResponse<Page<department::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<department::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.departments.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = DepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = ApiResponse<department::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn create_department(
    State(state): State<AppState>,
    Json(payload): Json<DepartmentRequest>,
) -> CreatedResult<department::Model> {
    validate_input(&payload)?;
    let department = state.services.departments.create(payload.into()).await?;
    Ok(created(department))
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/:id",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department fetched", body = ApiResponse<department::Model>),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<department::Model> {
    let department = state.services.departments.get(id).await?;
    Ok(Json(ApiResponse::success(department)))
}

#[utoipa::path(
    put,
    path = "/api/v1/departments/:id",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = DepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = ApiResponse<department::Model>),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DepartmentRequest>,
) -> ApiResult<department::Model> {
    validate_input(&payload)?;
    let department = state
        .services
        .departments
        .update(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(department)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/departments/:id",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.departments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
