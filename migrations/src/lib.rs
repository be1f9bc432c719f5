pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_personnel_tables;
mod m20240301_000002_create_payroll_attendance_tables;
mod m20240301_000003_create_product_tables;
mod m20240301_000004_create_ledger_tables;
mod m20240301_000005_create_warehouse_tables;
mod m20240301_000006_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_personnel_tables::Migration),
            Box::new(m20240301_000002_create_payroll_attendance_tables::Migration),
            Box::new(m20240301_000003_create_product_tables::Migration),
            Box::new(m20240301_000004_create_ledger_tables::Migration),
            Box::new(m20240301_000005_create_warehouse_tables::Migration),
            Box::new(m20240301_000006_add_lookup_indexes::Migration),
        ]
    }
}
