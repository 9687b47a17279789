//! Create `orders` table with FKs to `users` and `shops`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(integer(Orders::UserId))
                    .col(integer(Orders::ShopId))
                    .col(string_len(Orders::Recipient, 100))
                    .col(string_len(Orders::Telephone, 20))
                    .col(string_len(Orders::Address, 255))
                    .col(text(Orders::Note))
                    .col(string_len(Orders::StatusShipping, 32))
                    .col(double(Orders::TotalPrice))
                    .col(string_len(Orders::ProofPayment, 255))
                    // Explicitly nullable: only set while/after a cancellation
                    .col(string_len_null(Orders::CancelBy, 16))
                    .col(timestamp_with_time_zone(Orders::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_shop")
                            .from(Orders::Table, Orders::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    ShopId,
    Recipient,
    Telephone,
    Address,
    Note,
    StatusShipping,
    TotalPrice,
    ProofPayment,
    CancelBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }

#[derive(DeriveIden)]
enum Shops { Table, Id }
