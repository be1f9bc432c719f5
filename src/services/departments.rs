use crate::{
    entities::{department, employee, position},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentInput {
    pub name: String,
    pub description: Option<String>,
}

pub struct DepartmentFilters;

impl QueryFilters<department::Entity> for DepartmentFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<department::Entity>,
    ) -> Result<Select<department::Entity>, ServiceError> {
        Ok(match name {
            "search" => query.filter(
                Condition::any()
                    .add(department::Column::Name.contains(value))
                    .add(department::Column::Description.contains(value)),
            ),
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct DepartmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DepartmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn ensure_unique_name(&self, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = department::Entity::find().filter(department::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(department::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Department {} already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<department::Model>, ServiceError> {
        let query = department::Entity::find().order_by_asc(department::Column::Name);
        let query = filters::apply_filters(&DepartmentFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<department::Model, ServiceError> {
        super::find_or_404::<department::Entity, _>(&*self.db, "Department", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: DepartmentInput) -> Result<department::Model, ServiceError> {
        let name = input.name.trim().to_string();
        self.ensure_unique_name(&name, None).await?;

        let department = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(super::normalize_optional(input.description)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::DepartmentCreated(department.id));
        info!(department_id = %department.id, "Department created");
        Ok(department)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: DepartmentInput,
    ) -> Result<department::Model, ServiceError> {
        let existing = self.get(id).await?;
        let name = input.name.trim().to_string();
        self.ensure_unique_name(&name, Some(id)).await?;

        let mut active: department::ActiveModel = existing.into();
        active.name = Set(name);
        active.description = Set(super::normalize_optional(input.description));
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes the department; its positions and employees stay, unassigned.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let txn = self.db.begin().await?;
        employee::Entity::update_many()
            .col_expr(employee::Column::DepartmentId, Expr::value(Option::<Uuid>::None))
            .filter(employee::Column::DepartmentId.eq(id))
            .exec(&txn)
            .await?;
        position::Entity::update_many()
            .col_expr(position::Column::DepartmentId, Expr::value(Option::<Uuid>::None))
            .filter(position::Column::DepartmentId.eq(id))
            .exec(&txn)
            .await?;
        department::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::DepartmentDeleted(id));
        info!(department_id = %id, "Department deleted");
        Ok(())
    }
}
