use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per symbol, overwritten by every high-frequency cycle
        manager
            .create_table(
                Table::create()
                    .table(CurrentPrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CurrentPrices::Symbol)
                            .string_len(16)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CurrentPrices::Price)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CurrentPrices::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CurrentPrices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CurrentPrices {
    Table,
    Symbol,
    Price,
    LastUpdated,
}
