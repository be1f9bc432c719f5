use crate::{
    entities::payroll,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_amount, CreatedResult,
        NoContentResult,
    },
    services::payroll::GeneratePayrollInput,
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

pub fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payrolls).post(generate_payroll))
        .route("/:id", get(get_payroll).delete(delete_payroll))
        .route("/:id/pay", post(pay_payroll))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PayrollListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    /// pending or paid
    pub status: Option<String>,
    /// Earliest period start
    pub period_from: Option<NaiveDate>,
    /// Latest period end
    pub period_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "period_start": "2024-03-01",
    "period_end": "2024-03-31",
    "allowances": "250.00",
    "bonus": "100.00",
    "deductions": "75.50"
}))]
pub struct GeneratePayrollRequest {
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub allowances: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub bonus: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub deductions: Decimal,
}

impl From<GeneratePayrollRequest> for GeneratePayrollInput {
    fn from(req: GeneratePayrollRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            period_start: req.period_start,
            period_end: req.period_end,
            allowances: req.allowances,
            bonus: req.bonus,
            deductions: req.deductions,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payrolls",
    params(PayrollListQuery),
    responses(
        (status = 200, description = "Payrolls listed", body = ApiResponse<Page<payroll::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "payroll"
)]
pub async fn list_payrolls(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<payroll::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.payroll.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payrolls",
    request_body = GeneratePayrollRequest,
    responses(
        (status = 201, description = "Payroll generated", body = ApiResponse<payroll::Model>),
        (status = 400, description = "Invalid period or components", body = crate::errors::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payroll for this period already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "payroll"
)]
pub async fn generate_payroll(
    State(state): State<AppState>,
    Json(payload): Json<GeneratePayrollRequest>,
) -> CreatedResult<payroll::Model> {
    validate_input(&payload)?;
    let payroll = state.services.payroll.generate(payload.into()).await?;
    Ok(created(payroll))
}

#[utoipa::path(
    get,
    path = "/api/v1/payrolls/:id",
    params(("id" = Uuid, Path, description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll fetched", body = ApiResponse<payroll::Model>),
        (status = 404, description = "Payroll not found", body = crate::errors::ErrorResponse)
    ),
    tag = "payroll"
)]
pub async fn get_payroll(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<payroll::Model> {
    let payroll = state.services.payroll.get(id).await?;
    Ok(Json(ApiResponse::success(payroll)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payrolls/:id/pay",
    params(("id" = Uuid, Path, description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll marked paid", body = ApiResponse<payroll::Model>),
        (status = 404, description = "Payroll not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payroll already paid", body = crate::errors::ErrorResponse)
    ),
    tag = "payroll"
)]
pub async fn pay_payroll(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<payroll::Model> {
    let payroll = state.services.payroll.pay(id).await?;
    Ok(Json(ApiResponse::success(payroll)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/payrolls/:id",
    params(("id" = Uuid, Path, description = "Payroll ID")),
    responses(
        (status = 204, description = "Payroll deleted"),
        (status = 404, description = "Payroll not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Paid payrolls cannot be deleted", body = crate::errors::ErrorResponse)
    ),
    tag = "payroll"
)]
pub async fn delete_payroll(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.payroll.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
