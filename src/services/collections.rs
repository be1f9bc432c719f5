use super::balance_sheets::{apply_delta, publish_change, OnMissing};
use crate::{
    entities::{collection, employee, product_delivery},
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
pub struct RecordCollectionInput {
    pub employee_id: Uuid,
    pub delivery_id: Option<Uuid>,
    pub amount: Decimal,
    pub collected_on: NaiveDate,
    pub method: String,
    pub notes: Option<String>,
}

pub struct CollectionFilters;

impl QueryFilters<collection::Entity> for CollectionFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<collection::Entity>,
    ) -> Result<Select<collection::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => query
                .filter(collection::Column::EmployeeId.eq(filters::parse_uuid(name, value)?)),
            "delivery_id" => query
                .filter(collection::Column::DeliveryId.eq(filters::parse_uuid(name, value)?)),
            "method" => query.filter(collection::Column::Method.eq(value.to_ascii_lowercase())),
            "date_from" => query
                .filter(collection::Column::CollectedOn.gte(filters::parse_date(name, value)?)),
            "date_to" => query
                .filter(collection::Column::CollectedOn.lte(filters::parse_date(name, value)?)),
            _ => query,
        })
    }
}

/// Collections credit the collecting employee's balance sheet.
#[derive(Clone)]
pub struct CollectionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CollectionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<collection::Model>, ServiceError> {
        let query = collection::Entity::find()
            .order_by_desc(collection::Column::CollectedOn)
            .order_by_desc(collection::Column::CreatedAt);
        let query = filters::apply_filters(&CollectionFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<collection::Model, ServiceError> {
        super::find_or_404::<collection::Entity, _>(&*self.db, "Collection", id).await
    }

    #[instrument(skip(self))]
    pub async fn record(
        &self,
        input: RecordCollectionInput,
    ) -> Result<collection::Model, ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Collection amount must be greater than zero".to_string(),
            ));
        }

        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
            .await?;
        if let Some(delivery_id) = input.delivery_id {
            let delivery = super::find_or_404::<product_delivery::Entity, _>(
                &*self.db,
                "Delivery",
                delivery_id,
            )
            .await?;
            if delivery.employee_id != input.employee_id {
                return Err(ServiceError::ValidationError(format!(
                    "Delivery {} belongs to a different employee",
                    delivery_id
                )));
            }
        }

        let txn = self.db.begin().await?;
        let collection = collection::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(input.employee_id),
            delivery_id: Set(input.delivery_id),
            amount: Set(input.amount),
            collected_on: Set(input.collected_on),
            method: Set(input.method.trim().to_ascii_lowercase()),
            notes: Set(super::normalize_optional(input.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let sheet =
            apply_delta(&txn, collection.employee_id, collection.amount, OnMissing::Open).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CollectionRecorded {
            collection_id: collection.id,
            employee_id: collection.employee_id,
            amount: collection.amount,
        });
        publish_change(&self.event_sender, sheet.as_ref(), collection.amount, "collection_recorded");
        metrics::counter!("ems.collections.recorded", 1, "method" => collection.method.clone());
        info!(collection_id = %collection.id, employee_id = %collection.employee_id, "Collection recorded");
        Ok(collection)
    }

    /// Removes the collection and debits the amount back from an existing sheet
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let collection = super::lock_for_update::<collection::Entity, _>(
            &txn,
            "Collection",
            collection::Column::Id,
            id,
        )
        .await?;
        collection::Entity::delete_by_id(collection.id)
            .exec(&txn)
            .await?;
        let sheet =
            apply_delta(&txn, collection.employee_id, -collection.amount, OnMissing::Skip).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CollectionDeleted(collection.id));
        publish_change(&self.event_sender, sheet.as_ref(), -collection.amount, "collection_deleted");
        info!(collection_id = %collection.id, "Collection deleted");
        Ok(())
    }
}
