use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Singleton row (id = 1)
        manager
            .create_table(
                Table::create()
                    .table(MempoolSnapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MempoolSnapshot::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MempoolSnapshot::FastestFee).big_integer().not_null())
                    .col(ColumnDef::new(MempoolSnapshot::HalfHourFee).big_integer().not_null())
                    .col(ColumnDef::new(MempoolSnapshot::HourFee).big_integer().not_null())
                    .col(ColumnDef::new(MempoolSnapshot::BlockHeight).big_integer().not_null())
                    .col(ColumnDef::new(MempoolSnapshot::TxCount).big_integer().not_null())
                    .col(
                        ColumnDef::new(MempoolSnapshot::CalculatedSupply)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MempoolSnapshot::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MempoolSnapshot::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MempoolSnapshot {
    Table,
    Id,
    FastestFee,
    HalfHourFee,
    HourFee,
    BlockHeight,
    TxCount,
    CalculatedSupply,
    LastUpdated,
}
