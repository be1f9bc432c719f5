use crate::{
    entities::attendance,
    filters::{Page, QueryParams},
    handlers::common::{created, pagination, validate_input, CreatedResult, NoContentResult},
    services::attendance::{CheckInInput, CheckOutInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attendances))
        .route("/check-in", post(check_in))
        .route("/:id", get(get_attendance).delete(delete_attendance))
        .route("/:id/check-out", post(check_out))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    /// present or late
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "check_in": "2024-03-04T08:55:00Z"
}))]
pub struct CheckInRequest {
    pub employee_id: Uuid,
    /// Defaults to the time of the request
    pub check_in: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "check_out": "2024-03-04T17:30:00Z"
}))]
pub struct CheckOutRequest {
    /// Defaults to the time of the request
    pub check_out: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/attendances",
    params(AttendanceListQuery),
    responses(
        (status = 200, description = "Attendance records listed", body = ApiResponse<Page<attendance::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "attendance"
)]
pub async fn list_attendances(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<attendance::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.attendance.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendances/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = ApiResponse<attendance::Model>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already checked in for that day", body = crate::errors::ErrorResponse)
    ),
    tag = "attendance"
)]
pub async fn check_in(
    State(state): State<AppState>,
    Json(payload): Json<CheckInRequest>,
) -> CreatedResult<attendance::Model> {
    validate_input(&payload)?;
    let record = state
        .services
        .attendance
        .check_in(CheckInInput {
            employee_id: payload.employee_id,
            check_in: payload.check_in,
            notes: payload.notes,
        })
        .await?;
    Ok(created(record))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendances/:id/check-out",
    params(("id" = Uuid, Path, description = "Attendance ID")),
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out", body = ApiResponse<attendance::Model>),
        (status = 400, description = "Check-out precedes check-in", body = crate::errors::ErrorResponse),
        (status = 404, description = "Attendance not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already checked out", body = crate::errors::ErrorResponse)
    ),
    tag = "attendance"
)]
pub async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CheckOutRequest>>,
) -> ApiResult<attendance::Model> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    validate_input(&payload)?;
    let record = state
        .services
        .attendance
        .check_out(
            id,
            CheckOutInput {
                check_out: payload.check_out,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendances/:id",
    params(("id" = Uuid, Path, description = "Attendance ID")),
    responses(
        (status = 200, description = "Attendance fetched", body = ApiResponse<attendance::Model>),
        (status = 404, description = "Attendance not found", body = crate::errors::ErrorResponse)
    ),
    tag = "attendance"
)]
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<attendance::Model> {
    let record = state.services.attendance.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attendances/:id",
    params(("id" = Uuid, Path, description = "Attendance ID")),
    responses(
        (status = 204, description = "Attendance deleted"),
        (status = 404, description = "Attendance not found", body = crate::errors::ErrorResponse)
    ),
    tag = "attendance"
)]
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.attendance.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
