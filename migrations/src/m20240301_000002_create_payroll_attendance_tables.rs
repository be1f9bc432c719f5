use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payrolls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payrolls::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payrolls::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Payrolls::PeriodStart).date().not_null())
                    .col(ColumnDef::new(Payrolls::PeriodEnd).date().not_null())
                    .col(
                        ColumnDef::new(Payrolls::BasicSalary)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payrolls::Allowances)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Payrolls::Bonus)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Payrolls::Deductions)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Payrolls::NetPay)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payrolls::Status).string().not_null())
                    .col(
                        ColumnDef::new(Payrolls::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Payrolls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payrolls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payrolls_employee_id")
                            .from(Payrolls::Table, Payrolls::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attendances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attendances::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attendances::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Attendances::WorkDate).date().not_null())
                    .col(
                        ColumnDef::new(Attendances::CheckIn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attendances::CheckOut)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Attendances::Status).string().not_null())
                    .col(
                        ColumnDef::new(Attendances::HoursWorked)
                            .decimal_len(6, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(Attendances::Notes).text().null())
                    .col(
                        ColumnDef::new(Attendances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attendances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_employee_id")
                            .from(Attendances::Table, Attendances::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attendances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payrolls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Payrolls {
    Table,
    Id,
    EmployeeId,
    PeriodStart,
    PeriodEnd,
    BasicSalary,
    Allowances,
    Bonus,
    Deductions,
    NetPay,
    Status,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Attendances {
    Table,
    Id,
    EmployeeId,
    WorkDate,
    CheckIn,
    CheckOut,
    Status,
    HoursWorked,
    Notes,
    CreatedAt,
    UpdatedAt,
}
