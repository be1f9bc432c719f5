use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{entities, handlers, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management API",
        version = "1.0.0",
        description = r#"
# Employee Management API

Back office API for a field sales organisation.

## Features

- **Organisation**: Departments, positions and employees with promotion history
- **Payroll**: Period payrolls with allowances, bonuses and deductions
- **Attendance**: Daily check-in and check-out with late detection
- **Sales**: Products, deliveries with commission, cash collections
- **Expenses**: Employee expenses debited from running balances
- **Balance Sheets**: One running balance per employee
- **Warehouses**: Per-warehouse stock levels and transfers

## Error Handling

Errors share one body shape:

```json
{
  "error": "Not Found",
  "message": "Not found: Employee 7d9f8e2a-1b3c-4d5e-8f9a-0b1c2d3e4f5a not found",
  "request_id": "b7a4c3e2-...",
  "timestamp": "2024-03-01T10:30:00Z"
}
```

## Pagination

List endpoints accept `page` (from 1) and `per_page`. Unknown query
parameters are ignored; malformed filter values are rejected with 400.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "departments", description = "Department management"),
        (name = "positions", description = "Job positions and base salaries"),
        (name = "employees", description = "Employee records, promotions and balances"),
        (name = "payroll", description = "Payroll generation and payment"),
        (name = "attendance", description = "Check-in and check-out"),
        (name = "products", description = "Product catalogue and stock"),
        (name = "deliveries", description = "Product deliveries and commission"),
        (name = "collections", description = "Cash collected from customers"),
        (name = "expenses", description = "Employee expenses"),
        (name = "balance-sheets", description = "Employee running balances"),
        (name = "warehouses", description = "Warehouses and their inventory"),
        (name = "stock-transfers", description = "Stock moved between warehouses")
    ),
    paths(
        handlers::departments::list_departments,
        handlers::departments::create_department,
        handlers::departments::get_department,
        handlers::departments::update_department,
        handlers::departments::delete_department,

        handlers::positions::list_positions,
        handlers::positions::create_position,
        handlers::positions::get_position,
        handlers::positions::update_position,
        handlers::positions::delete_position,

        handlers::employees::list_employees,
        handlers::employees::create_employee,
        handlers::employees::get_employee,
        handlers::employees::update_employee,
        handlers::employees::delete_employee,
        handlers::employees::promote_employee,
        handlers::employees::list_promotions,
        handlers::employees::get_employee_balance,

        handlers::payroll::list_payrolls,
        handlers::payroll::generate_payroll,
        handlers::payroll::get_payroll,
        handlers::payroll::pay_payroll,
        handlers::payroll::delete_payroll,

        handlers::attendance::list_attendances,
        handlers::attendance::check_in,
        handlers::attendance::check_out,
        handlers::attendance::get_attendance,
        handlers::attendance::delete_attendance,

        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,

        handlers::deliveries::list_deliveries,
        handlers::deliveries::create_delivery,
        handlers::deliveries::get_delivery,
        handlers::deliveries::update_delivery,
        handlers::deliveries::complete_delivery,
        handlers::deliveries::cancel_delivery,
        handlers::deliveries::delete_delivery,

        handlers::collections::list_collections,
        handlers::collections::record_collection,
        handlers::collections::get_collection,
        handlers::collections::delete_collection,

        handlers::expenses::list_expenses,
        handlers::expenses::create_expense,
        handlers::expenses::get_expense,
        handlers::expenses::update_expense,
        handlers::expenses::delete_expense,

        handlers::balance_sheets::list_balance_sheets,
        handlers::balance_sheets::adjust_balance,

        handlers::warehouses::list_warehouses,
        handlers::warehouses::create_warehouse,
        handlers::warehouses::get_warehouse,
        handlers::warehouses::update_warehouse,
        handlers::warehouses::delete_warehouse,
        handlers::warehouses::get_inventory,
        handlers::warehouses::set_inventory,

        handlers::stock_transfers::list_transfers,
        handlers::stock_transfers::create_transfer,
        handlers::stock_transfers::get_transfer,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::errors::ErrorResponse,

            entities::department::Model,
            entities::position::Model,
            entities::employee::Model,
            entities::promotion_history::Model,
            entities::payroll::Model,
            entities::attendance::Model,
            entities::product::Model,
            entities::product_delivery::Model,
            entities::collection::Model,
            entities::expense::Model,
            entities::balance_sheet::Model,
            entities::warehouse::Model,
            entities::warehouse_inventory::Model,
            entities::stock_transfer::Model,
            entities::EmployeeStatus,
            entities::PayrollStatus,
            entities::AttendanceStatus,
            entities::DeliveryStatus,

            handlers::departments::DepartmentRequest,
            handlers::positions::PositionRequest,
            handlers::employees::EmployeeResponse,
            handlers::employees::CreateEmployeeRequest,
            handlers::employees::UpdateEmployeeRequest,
            handlers::employees::PromoteEmployeeRequest,
            handlers::employees::PromotionResponse,
            handlers::payroll::GeneratePayrollRequest,
            handlers::attendance::CheckInRequest,
            handlers::attendance::CheckOutRequest,
            handlers::products::CreateProductRequest,
            handlers::products::UpdateProductRequest,
            handlers::deliveries::CreateDeliveryRequest,
            handlers::deliveries::UpdateDeliveryRequest,
            handlers::collections::RecordCollectionRequest,
            handlers::expenses::CreateExpenseRequest,
            handlers::expenses::UpdateExpenseRequest,
            handlers::balance_sheets::AdjustBalanceRequest,
            handlers::warehouses::WarehouseRequest,
            handlers::warehouses::SetInventoryRequest,
            handlers::stock_transfers::TransferStockRequest,

            services::balance_sheets::EmployeeBalance,
            services::warehouses::InventoryLine,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_every_resource() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Employee Management API"));
        for path in [
            "/api/v1/departments",
            "/api/v1/employees/:id/promote",
            "/api/v1/payrolls/:id/pay",
            "/api/v1/attendances/check-in",
            "/api/v1/deliveries/:id/complete",
            "/api/v1/balance-sheets/adjust",
            "/api/v1/stock-transfers",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
    }
}
