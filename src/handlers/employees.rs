use crate::{
    entities::{
        employee::{self, EmployeeStatus},
        promotion_history,
    },
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_amount, validate_not_blank,
        CreatedResult, NoContentResult,
    },
    services::{
        balance_sheets::EmployeeBalance,
        employees::{CreateEmployeeInput, PromoteEmployeeInput, UpdateEmployeeInput},
    },
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
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn employees_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/:id/promote", post(promote_employee))
        .route("/:id/promotions", get(list_promotions))
        .route("/:id/balance", get(get_employee_balance))
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name, email or employee code
    pub search: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    /// active, on_leave or terminated
    pub status: Option<String>,
    pub hired_from: Option<NaiveDate>,
    pub hired_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a",
    "employee_code": "EMP-0042",
    "first_name": "Ada",
    "last_name": "Okafor",
    "full_name": "Ada Okafor",
    "email": "ada.okafor@example.com",
    "phone": "+234-800-000-0000",
    "department_id": "550e8400-e29b-41d4-a716-446655440000",
    "position_id": "660e8400-e29b-41d4-a716-446655440000",
    "hire_date": "2023-05-01",
    "salary": "4500.00",
    "status": "active",
    "is_active": true,
    "created_at": "2024-03-01T10:30:00Z",
    "updated_at": "2024-03-01T10:30:00Z"
}))]
pub struct EmployeeResponse {
    pub id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: NaiveDate,
    pub salary: Decimal,
    pub status: EmployeeStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<employee::Model> for EmployeeResponse {
    fn from(model: employee::Model) -> Self {
        Self {
            full_name: model.full_name(),
            is_active: model.is_active(),
            id: model.id,
            employee_code: model.employee_code,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            department_id: model.department_id,
            position_id: model.position_id,
            hire_date: model.hire_date,
            salary: model.salary,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "employee_code": "EMP-0042",
    "first_name": "Ada",
    "last_name": "Okafor",
    "email": "ada.okafor@example.com",
    "position_id": "660e8400-e29b-41d4-a716-446655440000",
    "hire_date": "2023-05-01"
}))]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 32), custom = "validate_not_blank")]
    pub employee_code: String,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub first_name: String,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: NaiveDate,
    /// Defaults to the position's base salary
    #[validate(custom = "validate_amount")]
    pub salary: Option<Decimal>,
}

impl From<CreateEmployeeRequest> for CreateEmployeeInput {
    fn from(req: CreateEmployeeRequest) -> Self {
        Self {
            employee_code: req.employee_code,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            department_id: req.department_id,
            position_id: req.position_id,
            hire_date: req.hire_date,
            salary: req.salary,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 32), custom = "validate_not_blank")]
    pub employee_code: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: Option<NaiveDate>,
    #[validate(custom = "validate_amount")]
    pub salary: Option<Decimal>,
    pub status: Option<EmployeeStatus>,
}

impl From<UpdateEmployeeRequest> for UpdateEmployeeInput {
    fn from(req: UpdateEmployeeRequest) -> Self {
        Self {
            employee_code: req.employee_code,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            department_id: req.department_id,
            position_id: req.position_id,
            hire_date: req.hire_date,
            salary: req.salary,
            status: req.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "to_position_id": "660e8400-e29b-41d4-a716-446655440000",
    "new_salary": "5200.00",
    "effective_date": "2024-04-01",
    "notes": "Annual review"
}))]
pub struct PromoteEmployeeRequest {
    pub to_position_id: Uuid,
    #[validate(custom = "validate_amount")]
    pub new_salary: Option<Decimal>,
    pub effective_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<PromoteEmployeeRequest> for PromoteEmployeeInput {
    fn from(req: PromoteEmployeeRequest) -> Self {
        Self {
            to_position_id: req.to_position_id,
            new_salary: req.new_salary,
            effective_date: req.effective_date,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionResponse {
    pub employee: EmployeeResponse,
    pub promotion: promotion_history::Model,
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeListQuery),
    responses(
        (status = 200, description = "Employees listed", body = ApiResponse<Page<EmployeeResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<EmployeeResponse>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.employees.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page.map(EmployeeResponse::from))))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = ApiResponse<EmployeeResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Employee code or email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> CreatedResult<EmployeeResponse> {
    validate_input(&payload)?;
    let employee = state.services.employees.create(payload.into()).await?;
    Ok(created(EmployeeResponse::from(employee)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee fetched", body = ApiResponse<EmployeeResponse>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeResponse> {
    let employee = state.services.employees.get(id).await?;
    Ok(Json(ApiResponse::success(EmployeeResponse::from(employee))))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = ApiResponse<EmployeeResponse>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Employee code or email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> ApiResult<EmployeeResponse> {
    validate_input(&payload)?;
    let employee = state.services.employees.update(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(EmployeeResponse::from(employee))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 204, description = "Employee and dependent records deleted"),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.employees.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/employees/:id/promote",
    params(("id" = Uuid, Path, description = "Employee ID")),
    request_body = PromoteEmployeeRequest,
    responses(
        (status = 200, description = "Employee promoted", body = ApiResponse<PromotionResponse>),
        (status = 404, description = "Employee or position not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Employee already holds the position or is terminated", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn promote_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromoteEmployeeRequest>,
) -> ApiResult<PromotionResponse> {
    validate_input(&payload)?;
    let (employee, promotion) = state.services.employees.promote(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(PromotionResponse {
        employee: EmployeeResponse::from(employee),
        promotion,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/:id/promotions",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Promotion history, newest first", body = ApiResponse<Vec<promotion_history::Model>>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<promotion_history::Model>> {
    let history = state.services.employees.promotions(id).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/:id/balance",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Current balance; zero before the first financial event", body = ApiResponse<EmployeeBalance>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "employees"
)]
pub async fn get_employee_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeBalance> {
    let balance = state.services.balance_sheets.for_employee(id).await?;
    Ok(Json(ApiResponse::success(balance)))
}
