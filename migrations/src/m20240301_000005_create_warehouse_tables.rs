use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Warehouses::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Warehouses::Name).string().not_null())
                    .col(
                        ColumnDef::new(Warehouses::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Warehouses::Location).string().null())
                    .col(
                        ColumnDef::new(Warehouses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WarehouseInventories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WarehouseInventories::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseInventories::WarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseInventories::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseInventories::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WarehouseInventories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseInventories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_warehouse_inventories_warehouse_id")
                            .from(
                                WarehouseInventories::Table,
                                WarehouseInventories::WarehouseId,
                            )
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_warehouse_inventories_product_id")
                            .from(
                                WarehouseInventories::Table,
                                WarehouseInventories::ProductId,
                            )
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockTransfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransfers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransfers::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockTransfers::FromWarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::ToWarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::TransferredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransfers::Notes).text().null())
                    .col(
                        ColumnDef::new(StockTransfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_product_id")
                            .from(StockTransfers::Table, StockTransfers::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_from_warehouse_id")
                            .from(StockTransfers::Table, StockTransfers::FromWarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_to_warehouse_id")
                            .from(StockTransfers::Table, StockTransfers::ToWarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WarehouseInventories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Warehouses {
    Table,
    Id,
    Name,
    Code,
    Location,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WarehouseInventories {
    Table,
    Id,
    WarehouseId,
    ProductId,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StockTransfers {
    Table,
    Id,
    ProductId,
    FromWarehouseId,
    ToWarehouseId,
    Quantity,
    TransferredAt,
    Notes,
    CreatedAt,
}
