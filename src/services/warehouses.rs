use crate::{
    entities::{product, stock_transfer, warehouse, warehouse_inventory},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseInput {
    pub name: String,
    pub code: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetInventoryInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferStockInput {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub quantity: i32,
    /// Defaults to now
    pub transferred_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// One product's stock in a warehouse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryLine {
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct WarehouseFilters;

impl QueryFilters<warehouse::Entity> for WarehouseFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<warehouse::Entity>,
    ) -> Result<Select<warehouse::Entity>, ServiceError> {
        Ok(match name {
            "search" => query.filter(
                Condition::any()
                    .add(warehouse::Column::Name.contains(value))
                    .add(warehouse::Column::Code.contains(value))
                    .add(warehouse::Column::Location.contains(value)),
            ),
            _ => query,
        })
    }
}

pub struct StockTransferFilters;

impl QueryFilters<stock_transfer::Entity> for StockTransferFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<stock_transfer::Entity>,
    ) -> Result<Select<stock_transfer::Entity>, ServiceError> {
        Ok(match name {
            "product_id" => query
                .filter(stock_transfer::Column::ProductId.eq(filters::parse_uuid(name, value)?)),
            "warehouse_id" => {
                let id = filters::parse_uuid(name, value)?;
                query.filter(
                    Condition::any()
                        .add(stock_transfer::Column::FromWarehouseId.eq(id))
                        .add(stock_transfer::Column::ToWarehouseId.eq(id)),
                )
            }
            "date_from" => query.filter(
                stock_transfer::Column::TransferredAt
                    .gte(filters::start_of_day(filters::parse_date(name, value)?)),
            ),
            "date_to" => query.filter(
                stock_transfer::Column::TransferredAt
                    .lt(filters::end_of_day_exclusive(filters::parse_date(name, value)?)),
            ),
            _ => query,
        })
    }
}

/// Adds `delta` to a warehouse's stock of a product, creating the row when
/// it does not exist yet.
async fn add_inventory<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    delta: i32,
) -> Result<(), ServiceError> {
    let updated = warehouse_inventory::Entity::update_many()
        .col_expr(
            warehouse_inventory::Column::Quantity,
            Expr::col(warehouse_inventory::Column::Quantity).add(delta),
        )
        .col_expr(warehouse_inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(warehouse_inventory::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_inventory::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        warehouse_inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            product_id: Set(product_id),
            quantity: Set(delta),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct WarehouseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WarehouseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn ensure_unique_code(&self, code: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = warehouse::Entity::find().filter(warehouse::Column::Code.eq(code));
        if let Some(id) = exclude {
            query = query.filter(warehouse::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Warehouse with code {} already exists",
                code
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<warehouse::Model>, ServiceError> {
        let query = warehouse::Entity::find().order_by_asc(warehouse::Column::Code);
        let query = filters::apply_filters(&WarehouseFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        super::find_or_404::<warehouse::Entity, _>(&*self.db, "Warehouse", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: WarehouseInput) -> Result<warehouse::Model, ServiceError> {
        let code = input.code.trim().to_ascii_uppercase();
        self.ensure_unique_code(&code, None).await?;

        let warehouse = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            code: Set(code),
            location: Set(super::normalize_optional(input.location)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::WarehouseCreated(warehouse.id));
        info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");
        Ok(warehouse)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: WarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let existing = self.get(id).await?;
        let code = input.code.trim().to_ascii_uppercase();
        self.ensure_unique_code(&code, Some(id)).await?;

        let mut active: warehouse::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.code = Set(code);
        active.location = Set(super::normalize_optional(input.location));
        Ok(active.update(&*self.db).await?)
    }

    /// Warehouses with transfer history are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        let transfers = stock_transfer::Entity::find()
            .filter(
                Condition::any()
                    .add(stock_transfer::Column::FromWarehouseId.eq(id))
                    .add(stock_transfer::Column::ToWarehouseId.eq(id)),
            )
            .count(&*self.db)
            .await?;
        if transfers > 0 {
            return Err(ServiceError::Conflict(format!(
                "Warehouse {} is referenced by {} stock transfers",
                id, transfers
            )));
        }

        warehouse::Entity::delete_by_id(id).exec(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::WarehouseDeleted(id));
        info!(warehouse_id = %id, "Warehouse deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn inventory(&self, warehouse_id: Uuid) -> Result<Vec<InventoryLine>, ServiceError> {
        self.get(warehouse_id).await?;
        let rows = warehouse_inventory::Entity::find()
            .filter(warehouse_inventory::Column::WarehouseId.eq(warehouse_id))
            .find_also_related(product::Entity)
            .order_by_asc(warehouse_inventory::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(line, product)| InventoryLine {
                product_id: line.product_id,
                sku: product.as_ref().map(|p| p.sku.clone()),
                product_name: product.map(|p| p.name),
                quantity: line.quantity,
                updated_at: line.updated_at,
            })
            .collect())
    }

    /// Sets the absolute quantity of a product held in a warehouse
    #[instrument(skip(self))]
    pub async fn set_inventory(
        &self,
        warehouse_id: Uuid,
        input: SetInventoryInput,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Inventory quantity cannot be negative".to_string(),
            ));
        }
        self.get(warehouse_id).await?;
        super::find_or_404::<product::Entity, _>(&*self.db, "Product", input.product_id).await?;

        let existing = warehouse_inventory::Entity::find()
            .filter(warehouse_inventory::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_inventory::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;

        let line = match existing {
            Some(line) => {
                let mut active: warehouse_inventory::ActiveModel = line.into();
                active.quantity = Set(input.quantity);
                active.update(&*self.db).await?
            }
            None => {
                warehouse_inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    warehouse_id: Set(warehouse_id),
                    product_id: Set(input.product_id),
                    quantity: Set(input.quantity),
                    ..Default::default()
                }
                .insert(&*self.db)
                .await?
            }
        };

        self.event_sender.send_or_log(Event::InventorySet {
            warehouse_id,
            product_id: line.product_id,
            quantity: line.quantity,
        });
        Ok(line)
    }

    #[instrument(skip(self, params))]
    pub async fn list_transfers(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<stock_transfer::Model>, ServiceError> {
        let query = stock_transfer::Entity::find()
            .order_by_desc(stock_transfer::Column::TransferredAt)
            .order_by_asc(stock_transfer::Column::Id);
        let query = filters::apply_filters(&StockTransferFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get_transfer(&self, id: Uuid) -> Result<stock_transfer::Model, ServiceError> {
        super::find_or_404::<stock_transfer::Entity, _>(&*self.db, "Stock transfer", id).await
    }

    /// Moves stock between warehouses. The source decrement is conditional on
    /// enough stock being present, so the total across warehouses is conserved.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        input: TransferStockInput,
    ) -> Result<stock_transfer::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Transfer quantity must be greater than zero".to_string(),
            ));
        }
        if input.from_warehouse_id == input.to_warehouse_id {
            return Err(ServiceError::ValidationError(
                "Source and destination warehouses must differ".to_string(),
            ));
        }

        let db = &*self.db;
        super::find_or_404::<product::Entity, _>(db, "Product", input.product_id).await?;
        super::find_or_404::<warehouse::Entity, _>(db, "Warehouse", input.from_warehouse_id)
            .await?;
        super::find_or_404::<warehouse::Entity, _>(db, "Warehouse", input.to_warehouse_id)
            .await?;

        // Conditional decrement first: it takes the write lock.
        let txn = self.db.begin().await?;

        let taken = warehouse_inventory::Entity::update_many()
            .col_expr(
                warehouse_inventory::Column::Quantity,
                Expr::col(warehouse_inventory::Column::Quantity).sub(input.quantity),
            )
            .col_expr(warehouse_inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(warehouse_inventory::Column::WarehouseId.eq(input.from_warehouse_id))
            .filter(warehouse_inventory::Column::ProductId.eq(input.product_id))
            .filter(warehouse_inventory::Column::Quantity.gte(input.quantity))
            .exec(&txn)
            .await?;
        if taken.rows_affected == 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "Warehouse {} holds fewer than {} units of product {}",
                input.from_warehouse_id, input.quantity, input.product_id
            )));
        }

        add_inventory(&txn, input.to_warehouse_id, input.product_id, input.quantity).await?;

        let transfer = stock_transfer::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            from_warehouse_id: Set(input.from_warehouse_id),
            to_warehouse_id: Set(input.to_warehouse_id),
            quantity: Set(input.quantity),
            transferred_at: Set(input.transferred_at.unwrap_or_else(Utc::now)),
            notes: Set(super::normalize_optional(input.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::StockTransferred {
            transfer_id: transfer.id,
            product_id: transfer.product_id,
            from_warehouse_id: transfer.from_warehouse_id,
            to_warehouse_id: transfer.to_warehouse_id,
            quantity: transfer.quantity,
        });
        metrics::counter!("ems.stock.transfers", 1);
        info!(
            transfer_id = %transfer.id,
            quantity = transfer.quantity,
            "Stock transferred"
        );
        Ok(transfer)
    }
}
