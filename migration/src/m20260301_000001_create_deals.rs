use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite caps decimal precision at 16 and stores it as REAL anyway
        let (amount_precision, amount_scale) = match manager.get_database_backend() {
            DatabaseBackend::Sqlite => (16, 4),
            _ => (19, 4),
        };

        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deals::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        // Authoritative duplicate guard; the service pre-check is only a fast path
                        ColumnDef::new(Deals::DealUniqueId)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Deals::FromCurrency)
                            .char_len(3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deals::ToCurrency)
                            .char_len(3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deals::DealAmount)
                            .decimal_len(amount_precision, amount_scale)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deals::DealTimestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deals_deal_timestamp")
                    .table(Deals::Table)
                    .col(Deals::DealTimestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deals::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Deals {
    Table,
    Id,
    DealUniqueId,
    FromCurrency,
    ToCurrency,
    DealAmount,
    DealTimestamp,
}
