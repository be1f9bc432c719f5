use crate::{
    entities::{department, employee, position},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct PositionInput {
    pub title: String,
    pub department_id: Option<Uuid>,
    pub base_salary: Decimal,
    pub description: Option<String>,
}

pub struct PositionFilters;

impl QueryFilters<position::Entity> for PositionFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<position::Entity>,
    ) -> Result<Select<position::Entity>, ServiceError> {
        Ok(match name {
            "search" => query.filter(
                Condition::any()
                    .add(position::Column::Title.contains(value))
                    .add(position::Column::Description.contains(value)),
            ),
            "department_id" => query
                .filter(position::Column::DepartmentId.eq(filters::parse_uuid(name, value)?)),
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct PositionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PositionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn check_input(&self, input: &PositionInput) -> Result<(), ServiceError> {
        if input.base_salary < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Base salary cannot be negative".to_string(),
            ));
        }
        if let Some(department_id) = input.department_id {
            super::find_or_404::<department::Entity, _>(&*self.db, "Department", department_id)
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<position::Model>, ServiceError> {
        let query = position::Entity::find().order_by_asc(position::Column::Title);
        let query = filters::apply_filters(&PositionFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<position::Model, ServiceError> {
        super::find_or_404::<position::Entity, _>(&*self.db, "Position", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: PositionInput) -> Result<position::Model, ServiceError> {
        self.check_input(&input).await?;

        let position = position::ActiveModel {
            id: Set(Uuid::new_v4()),
            department_id: Set(input.department_id),
            title: Set(input.title.trim().to_string()),
            base_salary: Set(input.base_salary),
            description: Set(super::normalize_optional(input.description)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::PositionCreated(position.id));
        info!(position_id = %position.id, "Position created");
        Ok(position)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: PositionInput,
    ) -> Result<position::Model, ServiceError> {
        let existing = self.get(id).await?;
        self.check_input(&input).await?;

        let mut active: position::ActiveModel = existing.into();
        active.title = Set(input.title.trim().to_string());
        active.department_id = Set(input.department_id);
        active.base_salary = Set(input.base_salary);
        active.description = Set(super::normalize_optional(input.description));
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes the position; employees holding it become unassigned.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let txn = self.db.begin().await?;
        employee::Entity::update_many()
            .col_expr(employee::Column::PositionId, Expr::value(Option::<Uuid>::None))
            .filter(employee::Column::PositionId.eq(id))
            .exec(&txn)
            .await?;
        position::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::PositionDeleted(id));
        info!(position_id = %id, "Position deleted");
        Ok(())
    }
}
