use crate::{
    entities::{
        department,
        employee::{self, EmployeeStatus},
        position, promotion_history,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployeeInput {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: NaiveDate,
    /// Falls back to the position's base salary
    pub salary: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployeeInput {
    pub employee_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub status: Option<EmployeeStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromoteEmployeeInput {
    pub to_position_id: Uuid,
    /// Falls back to the new position's base salary
    pub new_salary: Option<Decimal>,
    /// Defaults to today
    pub effective_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

pub struct EmployeeFilters;

impl QueryFilters<employee::Entity> for EmployeeFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<employee::Entity>,
    ) -> Result<Select<employee::Entity>, ServiceError> {
        Ok(match name {
            "search" => query.filter(
                Condition::any()
                    .add(employee::Column::FirstName.contains(value))
                    .add(employee::Column::LastName.contains(value))
                    .add(employee::Column::Email.contains(value))
                    .add(employee::Column::EmployeeCode.contains(value)),
            ),
            "department_id" => query
                .filter(employee::Column::DepartmentId.eq(filters::parse_uuid(name, value)?)),
            "position_id" => {
                query.filter(employee::Column::PositionId.eq(filters::parse_uuid(name, value)?))
            }
            "status" => query.filter(
                employee::Column::Status.eq(filters::parse_enum::<EmployeeStatus>(name, value)?),
            ),
            "hired_from" => {
                query.filter(employee::Column::HireDate.gte(filters::parse_date(name, value)?))
            }
            "hired_to" => {
                query.filter(employee::Column::HireDate.lte(filters::parse_date(name, value)?))
            }
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct EmployeeService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl EmployeeService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn ensure_unique(
        &self,
        employee_code: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let checks = [
            (employee::Column::EmployeeCode, employee_code, "employee code"),
            (employee::Column::Email, email, "email"),
        ];
        for (column, value, label) in checks {
            let Some(value) = value else { continue };
            let mut query = employee::Entity::find().filter(column.eq(value));
            if let Some(id) = exclude {
                query = query.filter(employee::Column::Id.ne(id));
            }
            if query.count(&*self.db).await? > 0 {
                return Err(ServiceError::Conflict(format!(
                    "An employee with {} {} already exists",
                    label, value
                )));
            }
        }
        Ok(())
    }

    async fn load_position(&self, id: Option<Uuid>) -> Result<Option<position::Model>, ServiceError> {
        match id {
            Some(id) => Ok(Some(
                super::find_or_404::<position::Entity, _>(&*self.db, "Position", id).await?,
            )),
            None => Ok(None),
        }
    }

    async fn ensure_department(&self, id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = id {
            super::find_or_404::<department::Entity, _>(&*self.db, "Department", id).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<employee::Model>, ServiceError> {
        let query = employee::Entity::find()
            .order_by_asc(employee::Column::LastName)
            .order_by_asc(employee::Column::FirstName)
            .order_by_asc(employee::Column::Id);
        let query = filters::apply_filters(&EmployeeFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<employee::Model, ServiceError> {
        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateEmployeeInput) -> Result<employee::Model, ServiceError> {
        let employee_code = input.employee_code.trim().to_string();
        let email = input.email.trim().to_ascii_lowercase();
        self.ensure_unique(Some(&employee_code), Some(&email), None)
            .await?;
        self.ensure_department(input.department_id).await?;
        let position = self.load_position(input.position_id).await?;

        let salary = match (input.salary, &position) {
            (Some(salary), _) => salary,
            (None, Some(position)) => position.base_salary,
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Salary is required when no position is given".to_string(),
                ))
            }
        };
        if salary < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Salary cannot be negative".to_string(),
            ));
        }
        let department_id = input
            .department_id
            .or_else(|| position.as_ref().and_then(|p| p.department_id));

        let employee = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_code: Set(employee_code),
            first_name: Set(input.first_name.trim().to_string()),
            last_name: Set(input.last_name.trim().to_string()),
            email: Set(email),
            phone: Set(super::normalize_optional(input.phone)),
            department_id: Set(department_id),
            position_id: Set(input.position_id),
            hire_date: Set(input.hire_date),
            salary: Set(salary),
            status: Set(EmployeeStatus::Active),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::EmployeeHired(employee.id));
        metrics::counter!("ems.employees.hired", 1);
        info!(employee_id = %employee.id, code = %employee.employee_code, "Employee hired");
        Ok(employee)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateEmployeeInput,
    ) -> Result<employee::Model, ServiceError> {
        let existing = self.get(id).await?;
        let employee_code = input.employee_code.map(|c| c.trim().to_string());
        let email = input.email.map(|e| e.trim().to_ascii_lowercase());
        self.ensure_unique(employee_code.as_deref(), email.as_deref(), Some(id))
            .await?;
        self.ensure_department(input.department_id).await?;
        self.load_position(input.position_id).await?;
        if matches!(input.salary, Some(salary) if salary < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Salary cannot be negative".to_string(),
            ));
        }

        let mut active: employee::ActiveModel = existing.into();
        if let Some(employee_code) = employee_code {
            active.employee_code = Set(employee_code);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if input.phone.is_some() {
            active.phone = Set(super::normalize_optional(input.phone));
        }
        if let Some(department_id) = input.department_id {
            active.department_id = Set(Some(department_id));
        }
        if let Some(position_id) = input.position_id {
            active.position_id = Set(Some(position_id));
        }
        if let Some(hire_date) = input.hire_date {
            active.hire_date = Set(hire_date);
        }
        if let Some(salary) = input.salary {
            active.salary = Set(salary);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }

        let employee = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::EmployeeUpdated(employee.id));
        info!(employee_id = %employee.id, "Employee updated");
        Ok(employee)
    }

    /// Removes the employee together with every dependent record.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        employee::Entity::delete_by_id(id).exec(&*self.db).await?;
        self.event_sender.send_or_log(Event::EmployeeDeleted(id));
        info!(employee_id = %id, "Employee deleted");
        Ok(())
    }

    /// Moves the employee to a new position and records the change.
    #[instrument(skip(self))]
    pub async fn promote(
        &self,
        id: Uuid,
        input: PromoteEmployeeInput,
    ) -> Result<(employee::Model, promotion_history::Model), ServiceError> {
        let target = super::find_or_404::<position::Entity, _>(
            &*self.db,
            "Position",
            input.to_position_id,
        )
        .await?;

        let txn = self.db.begin().await?;
        let employee =
            super::lock_for_update::<employee::Entity, _>(&txn, "Employee", employee::Column::Id, id)
                .await?;
        if employee.status == EmployeeStatus::Terminated {
            return Err(ServiceError::InvalidStatus(format!(
                "Employee {} is terminated and cannot be promoted",
                id
            )));
        }
        if employee.position_id == Some(input.to_position_id) {
            return Err(ServiceError::Conflict(format!(
                "Employee {} already holds position {}",
                id, input.to_position_id
            )));
        }

        let new_salary = input.new_salary.unwrap_or(target.base_salary);
        if new_salary < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Salary cannot be negative".to_string(),
            ));
        }
        let effective_date = input
            .effective_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let history = promotion_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            from_position_id: Set(employee.position_id),
            to_position_id: Set(target.id),
            previous_salary: Set(employee.salary),
            new_salary: Set(new_salary),
            effective_date: Set(effective_date),
            notes: Set(super::normalize_optional(input.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let from_position_id = employee.position_id;
        let mut active: employee::ActiveModel = employee.into();
        active.position_id = Set(Some(target.id));
        if let Some(department_id) = target.department_id {
            active.department_id = Set(Some(department_id));
        }
        active.salary = Set(new_salary);
        let promoted = active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::EmployeePromoted {
            employee_id: promoted.id,
            from_position_id,
            to_position_id: target.id,
            new_salary,
        });
        metrics::counter!("ems.employees.promoted", 1);
        info!(employee_id = %promoted.id, to_position_id = %target.id, "Employee promoted");
        Ok((promoted, history))
    }

    /// Promotion history, newest first
    #[instrument(skip(self))]
    pub async fn promotions(
        &self,
        id: Uuid,
    ) -> Result<Vec<promotion_history::Model>, ServiceError> {
        self.get(id).await?;
        Ok(promotion_history::Entity::find()
            .filter(promotion_history::Column::EmployeeId.eq(id))
            .order_by_desc(promotion_history::Column::EffectiveDate)
            .order_by_desc(promotion_history::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
