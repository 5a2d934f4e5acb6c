use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FearGreedHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FearGreedHistory::Date)
                            .date()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FearGreedHistory::Value).integer().not_null())
                    .col(
                        ColumnDef::new(FearGreedHistory::Classification)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FearGreedHistory::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FearGreedHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FearGreedHistory {
    Table,
    Date,
    Value,
    Classification,
    LastUpdated,
}
