use crate::{
    entities::{product, product_delivery, stock_transfer},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub commission_rate: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

pub struct ProductFilters;

impl QueryFilters<product::Entity> for ProductFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<product::Entity>,
    ) -> Result<Select<product::Entity>, ServiceError> {
        Ok(match name {
            "search" => query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(value))
                    .add(product::Column::Sku.contains(value)),
            ),
            "is_active" => {
                query.filter(product::Column::IsActive.eq(filters::parse_bool(name, value)?))
            }
            "min_price" => {
                query.filter(product::Column::Price.gte(filters::parse_decimal(name, value)?))
            }
            "max_price" => {
                query.filter(product::Column::Price.lte(filters::parse_decimal(name, value)?))
            }
            "low_stock" => query
                .filter(product::Column::StockQuantity.lte(filters::parse_i32(name, value)?)),
            _ => query,
        })
    }
}

fn validate_pricing(price: Decimal, commission_rate: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    if price > super::MAX_AMOUNT {
        return Err(ServiceError::ValidationError(format!(
            "Price cannot exceed {}",
            super::MAX_AMOUNT
        )));
    }
    if commission_rate < Decimal::ZERO || commission_rate > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "Commission rate must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn ensure_unique_sku(&self, sku: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU {} already exists",
                sku
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<product::Model>, ServiceError> {
        let query = product::Entity::find().order_by_asc(product::Column::Name);
        let query = filters::apply_filters(&ProductFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        super::find_or_404::<product::Entity, _>(&*self.db, "Product", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateProductInput) -> Result<product::Model, ServiceError> {
        validate_pricing(input.price, input.commission_rate)?;
        if input.stock_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Initial stock cannot be negative".to_string(),
            ));
        }
        let sku = input.sku.trim().to_string();
        self.ensure_unique_sku(&sku, None).await?;

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            sku: Set(sku),
            description: Set(super::normalize_optional(input.description)),
            price: Set(input.price),
            commission_rate: Set(input.commission_rate),
            stock_quantity: Set(input.stock_quantity),
            is_active: Set(input.is_active),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id));
        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get(id).await?;
        validate_pricing(
            input.price.unwrap_or(existing.price),
            input.commission_rate.unwrap_or(existing.commission_rate),
        )?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(sku) = input.sku {
            let sku = sku.trim().to_string();
            self.ensure_unique_sku(&sku, Some(id)).await?;
            active.sku = Set(sku);
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(super::normalize_optional(input.description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(rate) = input.commission_rate {
            active.commission_rate = Set(rate);
        }
        if let Some(stock) = input.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let product = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id));
        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Products referenced by deliveries or transfers are kept for history.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let deliveries = product_delivery::Entity::find()
            .filter(product_delivery::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        let transfers = stock_transfer::Entity::find()
            .filter(stock_transfer::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if deliveries > 0 || transfers > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} is referenced by {} deliveries and {} stock transfers",
                id, deliveries, transfers
            )));
        }

        product::Entity::delete_by_id(id).exec(&*self.db).await?;
        self.event_sender.send_or_log(Event::ProductDeleted(id));
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pricing_bounds() {
        assert!(validate_pricing(dec!(0), dec!(0)).is_ok());
        assert!(validate_pricing(dec!(10), dec!(100)).is_ok());
        assert!(validate_pricing(dec!(-1), dec!(5)).is_err());
        assert!(validate_pricing(dec!(10), dec!(100.01)).is_err());
        assert!(validate_pricing(dec!(10), dec!(-0.5)).is_err());
        assert!(validate_pricing(crate::services::MAX_AMOUNT, dec!(5)).is_ok());
        assert!(validate_pricing(dec!(1000000000000), dec!(5)).is_err());
    }
}
