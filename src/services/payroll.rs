use crate::{
    entities::{
        employee,
        payroll::{self, PayrollStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePayrollInput {
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub allowances: Decimal,
    pub bonus: Decimal,
    pub deductions: Decimal,
}

/// Pay components for one period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayComponents {
    pub basic_salary: Decimal,
    pub allowances: Decimal,
    pub bonus: Decimal,
    pub deductions: Decimal,
}

impl PayComponents {
    pub fn net_pay(&self) -> Decimal {
        self.basic_salary + self.allowances + self.bonus - self.deductions
    }

    /// Components must be non-negative and must not net below zero.
    pub fn validate(&self) -> Result<Decimal, ServiceError> {
        let fields = [
            ("basic_salary", self.basic_salary),
            ("allowances", self.allowances),
            ("bonus", self.bonus),
            ("deductions", self.deductions),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(format!(
                "{} cannot be negative",
                field
            )));
        }
        let net = self.net_pay();
        if net < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Deductions exceed gross pay; net pay would be {}",
                net
            )));
        }
        Ok(net)
    }
}

pub struct PayrollFilters;

impl QueryFilters<payroll::Entity> for PayrollFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<payroll::Entity>,
    ) -> Result<Select<payroll::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => {
                query.filter(payroll::Column::EmployeeId.eq(filters::parse_uuid(name, value)?))
            }
            "status" => query.filter(
                payroll::Column::Status.eq(filters::parse_enum::<PayrollStatus>(name, value)?),
            ),
            "period_from" => {
                query.filter(payroll::Column::PeriodStart.gte(filters::parse_date(name, value)?))
            }
            "period_to" => {
                query.filter(payroll::Column::PeriodEnd.lte(filters::parse_date(name, value)?))
            }
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct PayrollService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PayrollService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<payroll::Model>, ServiceError> {
        let query = payroll::Entity::find()
            .order_by_desc(payroll::Column::PeriodStart)
            .order_by_asc(payroll::Column::Id);
        let query = filters::apply_filters(&PayrollFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<payroll::Model, ServiceError> {
        super::find_or_404::<payroll::Entity, _>(&*self.db, "Payroll", id).await
    }

    /// Generates a pending payroll from the employee's current salary.
    #[instrument(skip(self))]
    pub async fn generate(&self, input: GeneratePayrollInput) -> Result<payroll::Model, ServiceError> {
        if input.period_end < input.period_start {
            return Err(ServiceError::ValidationError(
                "period_end must not be before period_start".to_string(),
            ));
        }
        let employee =
            super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
                .await?;

        let components = PayComponents {
            basic_salary: employee.salary,
            allowances: input.allowances,
            bonus: input.bonus,
            deductions: input.deductions,
        };
        let net_pay = components.validate()?;

        let existing = payroll::Entity::find()
            .filter(payroll::Column::EmployeeId.eq(employee.id))
            .filter(payroll::Column::PeriodStart.eq(input.period_start))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "Payroll for employee {} starting {} already exists",
                employee.id, input.period_start
            )));
        }

        let payroll = payroll::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            period_start: Set(input.period_start),
            period_end: Set(input.period_end),
            basic_salary: Set(components.basic_salary),
            allowances: Set(components.allowances),
            bonus: Set(components.bonus),
            deductions: Set(components.deductions),
            net_pay: Set(net_pay),
            status: Set(PayrollStatus::Pending),
            paid_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender.send_or_log(Event::PayrollGenerated {
            payroll_id: payroll.id,
            employee_id: payroll.employee_id,
            net_pay: payroll.net_pay,
        });
        metrics::counter!("ems.payrolls.generated", 1);
        info!(payroll_id = %payroll.id, net_pay = %payroll.net_pay, "Payroll generated");
        Ok(payroll)
    }

    #[instrument(skip(self))]
    pub async fn pay(&self, id: Uuid) -> Result<payroll::Model, ServiceError> {
        let payroll = self.get(id).await?;
        if payroll.is_paid() {
            return Err(ServiceError::InvalidStatus(format!(
                "Payroll {} is already paid",
                id
            )));
        }

        let transitioned = payroll::Entity::update_many()
            .set(payroll::ActiveModel {
                status: Set(PayrollStatus::Paid),
                paid_at: Set(Some(Utc::now())),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(payroll::Column::Id.eq(id))
            .filter(payroll::Column::Status.eq(PayrollStatus::Pending))
            .exec(&*self.db)
            .await?;
        if transitioned.rows_affected == 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "Payroll {} is already paid",
                id
            )));
        }

        self.event_sender.send_or_log(Event::PayrollPaid(id));
        info!(payroll_id = %id, "Payroll paid");
        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let payroll = self.get(id).await?;
        if payroll.is_paid() {
            return Err(ServiceError::InvalidStatus(format!(
                "Payroll {} is paid and cannot be deleted",
                id
            )));
        }
        payroll::Entity::delete_by_id(id).exec(&*self.db).await?;
        info!(payroll_id = %id, "Payroll deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn components(deductions: Decimal) -> PayComponents {
        PayComponents {
            basic_salary: dec!(3000),
            allowances: dec!(250.50),
            bonus: dec!(100),
            deductions,
        }
    }

    #[test]
    fn net_pay_is_gross_minus_deductions() {
        assert_eq!(components(dec!(350.50)).validate().unwrap(), dec!(3000));
    }

    #[test]
    fn negative_components_are_rejected() {
        assert_matches!(
            components(dec!(-1)).validate(),
            Err(ServiceError::ValidationError(msg)) if msg.contains("deductions")
        );
    }

    #[test]
    fn net_pay_cannot_go_negative() {
        assert_matches!(
            components(dec!(4000)).validate(),
            Err(ServiceError::ValidationError(_))
        );
    }
}
