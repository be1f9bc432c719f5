use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================
        // UNIQUE COMPOSITE KEYS
        // ============================================

        // One payroll per employee per period
        manager
            .create_index(
                Index::create()
                    .name("idx_payrolls_employee_period")
                    .table(Payrolls::Table)
                    .col(Payrolls::EmployeeId)
                    .col(Payrolls::PeriodStart)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One attendance row per employee per day
        manager
            .create_index(
                Index::create()
                    .name("idx_attendances_employee_work_date")
                    .table(Attendances::Table)
                    .col(Attendances::EmployeeId)
                    .col(Attendances::WorkDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_warehouse_inventories_warehouse_product")
                    .table(WarehouseInventories::Table)
                    .col(WarehouseInventories::WarehouseId)
                    .col(WarehouseInventories::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================
        // FOREIGN KEY / FILTER INDEXES
        // ============================================

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_department_id")
                    .table(Employees::Table)
                    .col(Employees::DepartmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_position_id")
                    .table(Employees::Table)
                    .col(Employees::PositionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_status")
                    .table(Employees::Table)
                    .col(Employees::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_deliveries_employee_status")
                    .table(ProductDeliveries::Table)
                    .col(ProductDeliveries::EmployeeId)
                    .col(ProductDeliveries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_deliveries_product_id")
                    .table(ProductDeliveries::Table)
                    .col(ProductDeliveries::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collections_employee_id")
                    .table(Collections::Table)
                    .col(Collections::EmployeeId)
                    .to_owned(),
            )
            .await?;

        // Expense listing is usually per employee, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_employee_date")
                    .table(Expenses::Table)
                    .col(Expenses::EmployeeId)
                    .col((Expenses::ExpenseDate, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_promotion_histories_employee_id")
                    .table(PromotionHistories::Table)
                    .col(PromotionHistories::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transfers_product_id")
                    .table(StockTransfers::Table)
                    .col(StockTransfers::ProductId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_transfers_product_id")
                    .table(StockTransfers::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_promotion_histories_employee_id")
                    .table(PromotionHistories::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_expenses_employee_date")
                    .table(Expenses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_collections_employee_id")
                    .table(Collections::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_deliveries_product_id")
                    .table(ProductDeliveries::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_deliveries_employee_status")
                    .table(ProductDeliveries::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_employees_status")
                    .table(Employees::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_employees_position_id")
                    .table(Employees::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_employees_department_id")
                    .table(Employees::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_warehouse_inventories_warehouse_product")
                    .table(WarehouseInventories::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_attendances_employee_work_date")
                    .table(Attendances::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_payrolls_employee_period")
                    .table(Payrolls::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    DepartmentId,
    PositionId,
    Status,
}

#[derive(DeriveIden)]
enum PromotionHistories {
    Table,
    EmployeeId,
}

#[derive(DeriveIden)]
enum Payrolls {
    Table,
    EmployeeId,
    PeriodStart,
}

#[derive(DeriveIden)]
enum Attendances {
    Table,
    EmployeeId,
    WorkDate,
}

#[derive(DeriveIden)]
enum ProductDeliveries {
    Table,
    EmployeeId,
    ProductId,
    Status,
}

#[derive(DeriveIden)]
enum Collections {
    Table,
    EmployeeId,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    EmployeeId,
    ExpenseDate,
}

#[derive(DeriveIden)]
enum WarehouseInventories {
    Table,
    WarehouseId,
    ProductId,
}

#[derive(DeriveIden)]
enum StockTransfers {
    Table,
    ProductId,
}
