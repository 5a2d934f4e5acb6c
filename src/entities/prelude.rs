//! `SeaORM` Entity prelude

pub use super::current_prices::Entity as CurrentPrices;
pub use super::daily_close_prices::Entity as DailyClosePrices;
pub use super::fear_greed_history::Entity as FearGreedHistory;
pub use super::global_metrics_history::Entity as GlobalMetricsHistory;
pub use super::mempool_snapshot::Entity as MempoolSnapshot;
pub use super::sync_status::Entity as SyncStatus;
