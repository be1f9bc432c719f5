use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog product that employees deliver and warehouses stock
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub price: Decimal,
    /// Percentage of a delivery's total paid as commission
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub commission_rate: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_delivery::Entity")]
    ProductDeliveries,
    #[sea_orm(has_many = "super::warehouse_inventory::Entity")]
    WarehouseInventories,
    #[sea_orm(has_many = "super::stock_transfer::Entity")]
    StockTransfers,
}

impl Related<super::product_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDeliveries.def()
    }
}

impl Related<super::warehouse_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseInventories.def()
    }
}

impl Related<super::stock_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransfers.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
