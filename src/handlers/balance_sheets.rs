use crate::{
    entities::balance_sheet,
    filters::{Page, QueryParams},
    handlers::common::{pagination, validate_input, validate_not_blank, validate_signed_amount},
    services::balance_sheets::{AdjustBalanceInput, EmployeeBalance},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn balance_sheets_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_balance_sheets))
        .route("/adjust", post(adjust_balance))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceSheetListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "amount": "-15.00",
    "reason": "Cash shortfall on route 4"
}))]
pub struct AdjustBalanceRequest {
    pub employee_id: Uuid,
    /// Signed amount; negative values debit the balance
    #[validate(custom = "validate_signed_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub reason: String,
}

impl From<AdjustBalanceRequest> for AdjustBalanceInput {
    fn from(req: AdjustBalanceRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            amount: req.amount,
            reason: req.reason,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/balance-sheets",
    params(BalanceSheetListQuery),
    responses(
        (status = 200, description = "Balance sheets listed, highest balance first", body = ApiResponse<Page<balance_sheet::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "balance-sheets"
)]
pub async fn list_balance_sheets(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<balance_sheet::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state
        .services
        .balance_sheets
        .list(&params, pagination)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/balance-sheets/adjust",
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "Balance adjusted", body = ApiResponse<EmployeeBalance>),
        (status = 400, description = "Zero amount or missing reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "balance-sheets"
)]
pub async fn adjust_balance(
    State(state): State<AppState>,
    Json(payload): Json<AdjustBalanceRequest>,
) -> ApiResult<EmployeeBalance> {
    validate_input(&payload)?;
    let balance = state.services.balance_sheets.adjust(payload.into()).await?;
    Ok(Json(ApiResponse::success(balance)))
}
