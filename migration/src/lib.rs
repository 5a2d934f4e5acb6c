pub use sea_orm_migration::prelude::*;

mod m20250610_000001_create_current_prices;
mod m20250610_000002_create_mempool_snapshot;
mod m20250610_000003_create_global_metrics_history;
mod m20250610_000004_create_daily_close_prices;
mod m20250610_000005_create_fear_greed_history;
mod m20250610_000006_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250610_000001_create_current_prices::Migration),
            Box::new(m20250610_000002_create_mempool_snapshot::Migration),
            Box::new(m20250610_000003_create_global_metrics_history::Migration),
            Box::new(m20250610_000004_create_daily_close_prices::Migration),
            Box::new(m20250610_000005_create_fear_greed_history::Migration),
            Box::new(m20250610_000006_create_sync_status::Migration),
        ]
    }
}
