pub mod attendance;
pub mod balance_sheets;
pub mod collections;
pub mod common;
pub mod deliveries;
pub mod departments;
pub mod employees;
pub mod expenses;
pub mod payroll;
pub mod positions;
pub mod products;
pub mod stock_transfers;
pub mod warehouses;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    attendance::AttendanceService, balance_sheets::BalanceSheetService,
    collections::CollectionService, deliveries::DeliveryService, departments::DepartmentService,
    employees::EmployeeService, expenses::ExpenseService, payroll::PayrollService,
    positions::PositionService, products::ProductService, warehouses::WarehouseService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub departments: Arc<DepartmentService>,
    pub positions: Arc<PositionService>,
    pub employees: Arc<EmployeeService>,
    pub payroll: Arc<PayrollService>,
    pub attendance: Arc<AttendanceService>,
    pub products: Arc<ProductService>,
    pub deliveries: Arc<DeliveryService>,
    pub collections: Arc<CollectionService>,
    pub expenses: Arc<ExpenseService>,
    pub balance_sheets: Arc<BalanceSheetService>,
    pub warehouses: Arc<WarehouseService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            departments: Arc::new(DepartmentService::new(db_pool.clone(), event_sender.clone())),
            positions: Arc::new(PositionService::new(db_pool.clone(), event_sender.clone())),
            employees: Arc::new(EmployeeService::new(db_pool.clone(), event_sender.clone())),
            payroll: Arc::new(PayrollService::new(db_pool.clone(), event_sender.clone())),
            attendance: Arc::new(AttendanceService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.late_after(),
            )),
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender.clone())),
            deliveries: Arc::new(DeliveryService::new(db_pool.clone(), event_sender.clone())),
            collections: Arc::new(CollectionService::new(db_pool.clone(), event_sender.clone())),
            expenses: Arc::new(ExpenseService::new(db_pool.clone(), event_sender.clone())),
            balance_sheets: Arc::new(BalanceSheetService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            warehouses: Arc::new(WarehouseService::new(db_pool, event_sender)),
        }
    }
}
