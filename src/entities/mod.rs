// Personnel
pub mod department;
pub mod employee;
pub mod position;
pub mod promotion_history;

// Payroll and attendance
pub mod attendance;
pub mod payroll;

// Products and deliveries
pub mod collection;
pub mod product;
pub mod product_delivery;

// Ledger
pub mod balance_sheet;
pub mod expense;

// Warehousing
pub mod stock_transfer;
pub mod warehouse;
pub mod warehouse_inventory;

pub use attendance::AttendanceStatus;
pub use employee::EmployeeStatus;
pub use payroll::PayrollStatus;
pub use product_delivery::DeliveryStatus;
