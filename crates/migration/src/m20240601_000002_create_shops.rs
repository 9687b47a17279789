//! Create `shops` table with FK to `users`.
//!
//! `user_id` is unique: a user owns at most one shop.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(pk_auto(Shops::Id))
                    .col(integer(Shops::UserId).unique_key())
                    .col(string_len(Shops::ShopName, 100))
                    .col(string_len(Shops::ShopTelephone, 20).default(""))
                    .col(string_len(Shops::ShopAddress, 255))
                    .col(string_len(Shops::AccountNumber, 50).default(""))
                    .col(string_len(Shops::QrisPicture, 255).default(""))
                    .col(string_len(Shops::StatusAdmin, 16).default("pending"))
                    .col(timestamp_with_time_zone(Shops::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shops_user")
                            .from(Shops::Table, Shops::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Shops::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Shops {
    Table,
    Id,
    UserId,
    ShopName,
    ShopTelephone,
    ShopAddress,
    AccountNumber,
    QrisPicture,
    StatusAdmin,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }
