use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GlobalMetricsHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GlobalMetricsHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GlobalMetricsHistory::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GlobalMetricsHistory::MarketCapUsd)
                            .decimal()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-record lookups order by observed_at
        manager
            .create_index(
                Index::create()
                    .name("idx_global_metrics_history_observed_at")
                    .table(GlobalMetricsHistory::Table)
                    .col(GlobalMetricsHistory::ObservedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GlobalMetricsHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GlobalMetricsHistory {
    Table,
    Id,
    ObservedAt,
    MarketCapUsd,
}
