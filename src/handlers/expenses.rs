use crate::{
    entities::expense,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_not_blank, validate_positive_amount,
        CreatedResult, NoContentResult,
    },
    services::expenses::{CreateExpenseInput, UpdateExpenseInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn expenses_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route(
            "/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "category": "fuel",
    "amount": "42.75",
    "expense_date": "2024-03-04",
    "description": "Van refuel"
}))]
pub struct CreateExpenseRequest {
    pub employee_id: Uuid,
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub category: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<CreateExpenseRequest> for CreateExpenseInput {
    fn from(req: CreateExpenseRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            category: req.category,
            amount: req.amount,
            expense_date: req.expense_date,
            description: req.description,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateExpenseRequest {
    /// Moving an expense re-credits the previous employee
    pub employee_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub category: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<UpdateExpenseRequest> for UpdateExpenseInput {
    fn from(req: UpdateExpenseRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            category: req.category,
            amount: req.amount,
            expense_date: req.expense_date,
            description: req.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseListQuery),
    responses(
        (status = 200, description = "Expenses listed", body = ApiResponse<Page<expense::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<expense::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.expenses.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded and balance debited", body = ApiResponse<expense::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpenseRequest>,
) -> CreatedResult<expense::Model> {
    validate_input(&payload)?;
    let expense = state.services.expenses.create(payload.into()).await?;
    Ok(created(expense))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/:id",
    params(("id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense fetched", body = ApiResponse<expense::Model>),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<expense::Model> {
    let expense = state.services.expenses.get(id).await?;
    Ok(Json(ApiResponse::success(expense)))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/:id",
    params(("id" = Uuid, Path, description = "Expense ID")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated and balances rebalanced", body = ApiResponse<expense::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Expense or employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> ApiResult<expense::Model> {
    validate_input(&payload)?;
    let expense = state.services.expenses.update(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(expense)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/:id",
    params(("id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 204, description = "Expense deleted and balance credited back"),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.expenses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
