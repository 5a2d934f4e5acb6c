use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Keyed by calendar day; rows are insert-if-absent and never updated
        manager
            .create_table(
                Table::create()
                    .table(DailyClosePrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyClosePrices::Date)
                            .date()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyClosePrices::PriceUsd)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyClosePrices::PriceBrl)
                            .decimal()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyClosePrices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DailyClosePrices {
    Table,
    Date,
    PriceUsd,
    PriceBrl,
}
