//! Create `order_items` table with FKs to `orders` and `products`.
//!
//! Product name/label/image are copied at checkout so an order stays
//! readable after the product is edited or deleted (`product_id` set null).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(pk_auto(OrderItems::Id))
                    .col(integer(OrderItems::OrderId))
                    .col(integer_null(OrderItems::ProductId))
                    .col(string_len(OrderItems::ProductName, 100))
                    .col(string_len(OrderItems::ProductLabel, 100))
                    .col(string_len(OrderItems::ProductImage, 255))
                    .col(integer(OrderItems::Quantity))
                    .col(integer(OrderItems::StockTaken).default(0))
                    .col(double(OrderItems::Price))
                    .col(double(OrderItems::SubTotal))
                    .col(timestamp_with_time_zone(OrderItems::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_product")
                            .from(OrderItems::Table, OrderItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(OrderItems::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    ProductLabel,
    ProductImage,
    Quantity,
    StockTaken,
    Price,
    SubTotal,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders { Table, Id }

#[derive(DeriveIden)]
enum Products { Table, Id }
