use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns the sender with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes without blocking the caller. A full or closed channel is logged
    /// and the event is dropped; the request that produced it still succeeds.
    pub fn send_or_log(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => {
                metrics::counter!("ems.events.published", 1, "event" => name);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("ems.events.dropped", 1, "event" => name);
                warn!(event = name, "event channel full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics::counter!("ems.events.dropped", 1, "event" => name);
                warn!(event = name, "event channel closed; dropping event");
            }
        }
    }
}

/// Domain events raised by the services after a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DepartmentCreated(Uuid),
    DepartmentDeleted(Uuid),
    PositionCreated(Uuid),
    PositionDeleted(Uuid),

    EmployeeHired(Uuid),
    EmployeeUpdated(Uuid),
    EmployeeDeleted(Uuid),
    EmployeePromoted {
        employee_id: Uuid,
        from_position_id: Option<Uuid>,
        to_position_id: Uuid,
        new_salary: Decimal,
    },

    PayrollGenerated {
        payroll_id: Uuid,
        employee_id: Uuid,
        net_pay: Decimal,
    },
    PayrollPaid(Uuid),

    CheckedIn {
        attendance_id: Uuid,
        employee_id: Uuid,
        late: bool,
    },
    CheckedOut {
        attendance_id: Uuid,
        hours_worked: Decimal,
    },

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StockWentNegative {
        product_id: Uuid,
        stock_quantity: i32,
    },

    DeliveryCreated {
        delivery_id: Uuid,
        employee_id: Uuid,
        commission_amount: Decimal,
    },
    DeliveryCompleted {
        delivery_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        commission_amount: Decimal,
    },
    DeliveryCancelled(Uuid),

    CollectionRecorded {
        collection_id: Uuid,
        employee_id: Uuid,
        amount: Decimal,
    },
    CollectionDeleted(Uuid),

    ExpenseRecorded {
        expense_id: Uuid,
        employee_id: Uuid,
        amount: Decimal,
    },
    ExpenseUpdated(Uuid),
    ExpenseDeleted(Uuid),

    BalanceChanged {
        employee_id: Uuid,
        delta: Decimal,
        new_balance: Decimal,
        reason: String,
    },

    WarehouseCreated(Uuid),
    WarehouseDeleted(Uuid),
    InventorySet {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockTransferred {
        transfer_id: Uuid,
        product_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        quantity: i32,
    },
}

impl Event {
    /// Stable metric/log label for the event kind
    pub fn name(&self) -> &'static str {
        match self {
            Event::DepartmentCreated(_) => "department_created",
            Event::DepartmentDeleted(_) => "department_deleted",
            Event::PositionCreated(_) => "position_created",
            Event::PositionDeleted(_) => "position_deleted",
            Event::EmployeeHired(_) => "employee_hired",
            Event::EmployeeUpdated(_) => "employee_updated",
            Event::EmployeeDeleted(_) => "employee_deleted",
            Event::EmployeePromoted { .. } => "employee_promoted",
            Event::PayrollGenerated { .. } => "payroll_generated",
            Event::PayrollPaid(_) => "payroll_paid",
            Event::CheckedIn { .. } => "checked_in",
            Event::CheckedOut { .. } => "checked_out",
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeleted(_) => "product_deleted",
            Event::StockWentNegative { .. } => "stock_went_negative",
            Event::DeliveryCreated { .. } => "delivery_created",
            Event::DeliveryCompleted { .. } => "delivery_completed",
            Event::DeliveryCancelled(_) => "delivery_cancelled",
            Event::CollectionRecorded { .. } => "collection_recorded",
            Event::CollectionDeleted(_) => "collection_deleted",
            Event::ExpenseRecorded { .. } => "expense_recorded",
            Event::ExpenseUpdated(_) => "expense_updated",
            Event::ExpenseDeleted(_) => "expense_deleted",
            Event::BalanceChanged { .. } => "balance_changed",
            Event::WarehouseCreated(_) => "warehouse_created",
            Event::WarehouseDeleted(_) => "warehouse_deleted",
            Event::InventorySet { .. } => "inventory_set",
            Event::StockTransferred { .. } => "stock_transferred",
        }
    }
}

// Single consumer for the domain event channel. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("ems.events.processed", 1, "event" => event.name());

        match &event {
            Event::StockWentNegative {
                product_id,
                stock_quantity,
            } => {
                warn!(
                    product_id = %product_id,
                    stock_quantity,
                    "Product stock is below zero"
                );
            }
            Event::BalanceChanged {
                employee_id,
                delta,
                new_balance,
                reason,
            } => {
                info!(
                    employee_id = %employee_id,
                    delta = %delta,
                    new_balance = %new_balance,
                    reason = %reason,
                    "Balance sheet updated"
                );
            }
            Event::DeliveryCompleted {
                delivery_id,
                product_id,
                quantity,
                commission_amount,
            } => {
                info!(
                    delivery_id = %delivery_id,
                    product_id = %product_id,
                    quantity,
                    commission = %commission_amount,
                    "Delivery completed"
                );
            }
            Event::PayrollPaid(payroll_id) => {
                info!(payroll_id = %payroll_id, "Payroll paid");
            }
            other => {
                debug!(event = other.name(), payload = ?other, "Domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_delivers_when_capacity_allows() {
        let (sender, mut rx) = EventSender::channel(4);
        let id = Uuid::new_v4();
        sender.send_or_log(Event::EmployeeHired(id));

        match rx.recv().await {
            Some(Event::EmployeeHired(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_never_fails_when_full_or_closed() {
        let (sender, rx) = EventSender::channel(1);
        sender.send_or_log(Event::PayrollPaid(Uuid::new_v4()));
        // Channel is full now; this one is dropped
        sender.send_or_log(Event::PayrollPaid(Uuid::new_v4()));

        drop(rx);
        sender.send_or_log(Event::PayrollPaid(Uuid::new_v4()));
        assert!(sender.send(Event::PayrollPaid(Uuid::new_v4())).await.is_err());
    }

    #[tokio::test]
    async fn process_events_drains_until_senders_drop() {
        let (sender, rx) = EventSender::channel(8);
        let consumer = tokio::spawn(process_events(rx));

        sender.send_or_log(Event::StockWentNegative {
            product_id: Uuid::new_v4(),
            stock_quantity: -3,
        });
        drop(sender);

        consumer.await.unwrap();
    }
}
