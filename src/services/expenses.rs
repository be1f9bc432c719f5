use super::balance_sheets::{apply_delta, publish_change, OnMissing};
use crate::{
    entities::{employee, expense},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenseInput {
    pub employee_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpenseInput {
    pub employee_id: Option<Uuid>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
    pub description: Option<String>,
}

pub struct ExpenseFilters;

impl QueryFilters<expense::Entity> for ExpenseFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<expense::Entity>,
    ) -> Result<Select<expense::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => {
                query.filter(expense::Column::EmployeeId.eq(filters::parse_uuid(name, value)?))
            }
            "category" => query.filter(expense::Column::Category.eq(value)),
            "date_from" => {
                query.filter(expense::Column::ExpenseDate.gte(filters::parse_date(name, value)?))
            }
            "date_to" => {
                query.filter(expense::Column::ExpenseDate.lte(filters::parse_date(name, value)?))
            }
            "min_amount" => {
                query.filter(expense::Column::Amount.gte(filters::parse_decimal(name, value)?))
            }
            "max_amount" => {
                query.filter(expense::Column::Amount.lte(filters::parse_decimal(name, value)?))
            }
            _ => query,
        })
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Expense amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Balance movements needed to take an expense from `old` to `new`.
/// Each entry is `(employee_id, delta)`; expenses debit, so deltas are negated amounts.
pub fn rebalance_deltas(
    old_employee: Uuid,
    old_amount: Decimal,
    new_employee: Uuid,
    new_amount: Decimal,
) -> Vec<(Uuid, Decimal)> {
    if old_employee == new_employee {
        let delta = old_amount - new_amount;
        if delta.is_zero() {
            Vec::new()
        } else {
            vec![(old_employee, delta)]
        }
    } else {
        vec![(old_employee, old_amount), (new_employee, -new_amount)]
    }
}

/// Expenses debit the employee's balance sheet for the life of the row.
#[derive(Clone)]
pub struct ExpenseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ExpenseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<expense::Model>, ServiceError> {
        let query = expense::Entity::find()
            .order_by_desc(expense::Column::ExpenseDate)
            .order_by_desc(expense::Column::CreatedAt);
        let query = filters::apply_filters(&ExpenseFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<expense::Model, ServiceError> {
        super::find_or_404::<expense::Entity, _>(&*self.db, "Expense", id).await
    }

    /// Records the expense and debits the employee's balance, opening the
    /// sheet on first use.
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateExpenseInput) -> Result<expense::Model, ServiceError> {
        ensure_positive(input.amount)?;

        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
            .await?;

        let txn = self.db.begin().await?;
        let expense = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(input.employee_id),
            category: Set(input.category.trim().to_string()),
            amount: Set(input.amount),
            expense_date: Set(input.expense_date),
            description: Set(super::normalize_optional(input.description)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let sheet = apply_delta(&txn, expense.employee_id, -expense.amount, OnMissing::Open).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::ExpenseRecorded {
            expense_id: expense.id,
            employee_id: expense.employee_id,
            amount: expense.amount,
        });
        publish_change(&self.event_sender, sheet.as_ref(), -expense.amount, "expense_recorded");
        metrics::counter!("ems.expenses.recorded", 1);
        info!(expense_id = %expense.id, employee_id = %expense.employee_id, "Expense recorded");
        Ok(expense)
    }

    /// Edits an expense, moving the balance by the difference. Switching the
    /// employee credits the previous employee and debits the new one.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<expense::Model, ServiceError> {
        if let Some(amount) = input.amount {
            ensure_positive(amount)?;
        }

        if let Some(employee_id) = input.employee_id {
            super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", employee_id).await?;
        }

        let txn = self.db.begin().await?;
        let existing =
            super::lock_for_update::<expense::Entity, _>(&txn, "Expense", expense::Column::Id, id)
                .await?;
        let new_employee = input.employee_id.unwrap_or(existing.employee_id);
        let new_amount = input.amount.unwrap_or(existing.amount);

        let deltas = rebalance_deltas(
            existing.employee_id,
            existing.amount,
            new_employee,
            new_amount,
        );

        let mut active: expense::ActiveModel = existing.into();
        active.employee_id = Set(new_employee);
        active.amount = Set(new_amount);
        if let Some(category) = input.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(expense_date) = input.expense_date {
            active.expense_date = Set(expense_date);
        }
        if input.description.is_some() {
            active.description = Set(super::normalize_optional(input.description));
        }
        let updated = active.update(&txn).await?;

        let mut changes = Vec::with_capacity(deltas.len());
        for (employee_id, delta) in deltas {
            // Only the incoming employee may need a new sheet
            let on_missing = if employee_id == new_employee && delta.is_sign_negative() {
                OnMissing::Open
            } else {
                OnMissing::Skip
            };
            let sheet = apply_delta(&txn, employee_id, delta, on_missing).await?;
            changes.push((sheet, delta));
        }
        txn.commit().await?;

        self.event_sender.send_or_log(Event::ExpenseUpdated(updated.id));
        for (sheet, delta) in &changes {
            publish_change(&self.event_sender, sheet.as_ref(), *delta, "expense_updated");
        }
        info!(expense_id = %updated.id, "Expense updated");
        Ok(updated)
    }

    /// Deletes the expense and credits the amount back. Employees without a
    /// sheet are left without one.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let expense =
            super::lock_for_update::<expense::Entity, _>(&txn, "Expense", expense::Column::Id, id)
                .await?;
        expense::Entity::delete_by_id(expense.id).exec(&txn).await?;
        let sheet = apply_delta(&txn, expense.employee_id, expense.amount, OnMissing::Skip).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::ExpenseDeleted(expense.id));
        publish_change(&self.event_sender, sheet.as_ref(), expense.amount, "expense_deleted");
        info!(expense_id = %expense.id, "Expense deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn same_employee_moves_by_difference() {
        let employee = Uuid::new_v4();
        assert_eq!(
            rebalance_deltas(employee, dec!(40), employee, dec!(55)),
            vec![(employee, dec!(-15))]
        );
        assert_eq!(
            rebalance_deltas(employee, dec!(40), employee, dec!(10)),
            vec![(employee, dec!(30))]
        );
    }

    #[test]
    fn unchanged_amount_is_a_no_op() {
        let employee = Uuid::new_v4();
        assert!(rebalance_deltas(employee, dec!(12.50), employee, dec!(12.5)).is_empty());
    }

    #[test]
    fn employee_switch_credits_old_and_debits_new() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        assert_eq!(
            rebalance_deltas(old, dec!(20), new, dec!(25)),
            vec![(old, dec!(20)), (new, dec!(-25))]
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(ensure_positive(dec!(0)).is_err());
        assert!(ensure_positive(dec!(-1)).is_err());
        assert!(ensure_positive(dec!(0.01)).is_ok());
    }
}
