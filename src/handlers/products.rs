use crate::{
    entities::product,
    filters::{Page, QueryParams},
    handlers::common::{
        created, pagination, validate_input, validate_amount, validate_not_blank,
        validate_percentage, CreatedResult, NoContentResult,
    },
    services::products::{CreateProductInput, UpdateProductInput},
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

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name or SKU
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Products with stock at or below this quantity
    pub low_stock: Option<i32>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Water Filter Cartridge",
    "sku": "WF-100",
    "price": "24.99",
    "commission_rate": "7.50",
    "stock_quantity": 120
}))]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub sku: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Decimal,
    /// Percent of the delivery total paid as commission
    #[serde(default)]
    #[validate(custom = "validate_percentage")]
    pub commission_rate: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<CreateProductRequest> for CreateProductInput {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            sku: req.sku,
            description: req.description,
            price: req.price,
            commission_rate: req.commission_rate,
            stock_quantity: req.stock_quantity,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub sku: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_percentage")]
    pub commission_rate: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

impl From<UpdateProductRequest> for UpdateProductInput {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            sku: req.sku,
            description: req.description,
            price: req.price,
            commission_rate: req.commission_rate,
            stock_quantity: req.stock_quantity,
            is_active: req.is_active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products listed", body = ApiResponse<Page<product::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Page<product::Model>> {
    let pagination = pagination(&state, &params)?;
    let page = state.services.products.list(&params, pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> CreatedResult<product::Model> {
    validate_input(&payload)?;
    let product = state.services.products.create(payload.into()).await?;
    Ok(created(product))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    validate_input(&payload)?;
    let product = state.services.products.update(id, payload.into()).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has deliveries or transfers", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> NoContentResult {
    state.services.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
