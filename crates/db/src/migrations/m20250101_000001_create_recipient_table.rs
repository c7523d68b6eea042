//! Create recipient table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Recipient::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recipient::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Recipient::TelegramUserId).big_integer().not_null())
                    .col(ColumnDef::new(Recipient::Username).string_len(64))
                    .col(ColumnDef::new(Recipient::FirstName).string_len(256))
                    .col(ColumnDef::new(Recipient::LastName).string_len(256))
                    .col(ColumnDef::new(Recipient::FirstStartParam).string_len(64))
                    .col(
                        ColumnDef::new(Recipient::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Recipient::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: telegram_user_id (upsert key)
        manager
            .create_index(
                Index::create()
                    .name("idx_recipient_telegram_user_id")
                    .table(Recipient::Table)
                    .col(Recipient::TelegramUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: first_start_param (attribution reports)
        manager
            .create_index(
                Index::create()
                    .name("idx_recipient_first_start_param")
                    .table(Recipient::Table)
                    .col(Recipient::FirstStartParam)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Recipient::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Recipient {
    Table,
    Id,
    TelegramUserId,
    Username,
    FirstName,
    LastName,
    FirstStartParam,
    CreatedAt,
    UpdatedAt,
}
