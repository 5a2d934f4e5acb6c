#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use bitpanel_backend::config::RefreshConfig;
use bitpanel_backend::services::fear_greed::FearGreedReading;
use bitpanel_backend::services::market_data::{
    Currency, MarketDataSource, SourceResult, SpotQuotes,
};
use bitpanel_backend::services::mempool::RecommendedFees;
use bitpanel_backend::services::refresh::RefreshCoordinator;
use bitpanel_backend::services::store::SnapshotStore;

pub const BTC_USD: f64 = 60000.0;
pub const BTC_BRL: f64 = 300000.0;
pub const USDT_BRL: f64 = 5.0;
/// Exactly four halving epochs
pub const TIP_HEIGHT: u64 = 840_000;
pub const SUPPLY_AT_TIP: i64 = 19_687_550;

/// Fresh in-memory SQLite database with all migrations applied.
/// One connection only: every pooled connection would otherwise see its own
/// empty in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> RefreshConfig {
    RefreshConfig {
        fetch_timeout: Duration::from_secs(2),
        backfill_days: 30,
        ..RefreshConfig::default()
    }
}

pub async fn setup_coordinator(
    source: Arc<ScriptedSource>,
    config: RefreshConfig,
) -> RefreshCoordinator {
    let db = setup_test_db().await.expect("Failed to set up test DB");
    RefreshCoordinator::new(SnapshotStore::new(db), source, config)
}

/// `days` daily samples at 00:00 UTC, oldest first, ending yesterday.
/// The sample for `today - n` is priced `price_for(n)`.
pub fn daily_samples<F>(days: i64, price_for: F) -> Vec<(i64, f64)>
where
    F: Fn(i64) -> f64,
{
    let today = Utc::now().date_naive();
    (1..=days)
        .rev()
        .map(|n| {
            let date = today - ChronoDuration::days(n);
            let midnight = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
            (midnight.timestamp_millis(), price_for(n))
        })
        .collect()
}

/// Scripted market data. `None` in any slot makes that call fail.
pub struct ScriptedSource {
    pub spot: Mutex<Option<SpotQuotes>>,
    pub fees: Mutex<Option<RecommendedFees>>,
    pub tip: Mutex<Option<u64>>,
    pub tx_count: Mutex<Option<i64>>,
    pub fear_greed: Mutex<Option<FearGreedReading>>,
    pub history: Mutex<HashMap<Currency, Vec<(i64, f64)>>>,
    /// When set, `spot_prices` waits for a notification first
    pub spot_gate: Option<Arc<Notify>>,
    /// `tip_height` never resolves
    pub hang_tip: bool,
    pub history_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn healthy() -> Self {
        let usd = daily_samples(30, |n| 40000.0 + n as f64);
        let brl = usd.iter().map(|(t, p)| (*t, p * 5.0)).collect();

        Self {
            spot: Mutex::new(Some(SpotQuotes {
                btc_usd: Some(BTC_USD),
                btc_brl: Some(BTC_BRL),
                usdt_brl: Some(USDT_BRL),
            })),
            fees: Mutex::new(Some(RecommendedFees {
                fastest_fee: 20,
                half_hour_fee: 12,
                hour_fee: 6,
            })),
            tip: Mutex::new(Some(TIP_HEIGHT)),
            tx_count: Mutex::new(Some(12_345)),
            fear_greed: Mutex::new(Some(FearGreedReading {
                value: 55,
                classification: "Greed".to_string(),
            })),
            history: Mutex::new(HashMap::from([(Currency::Usd, usd), (Currency::Brl, brl)])),
            spot_gate: None,
            hang_tip: false,
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            spot: Mutex::new(None),
            fees: Mutex::new(None),
            tip: Mutex::new(None),
            tx_count: Mutex::new(None),
            fear_greed: Mutex::new(None),
            history: Mutex::new(HashMap::new()),
            spot_gate: None,
            hang_tip: false,
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_history(&self, currency: Currency, samples: Vec<(i64, f64)>) {
        self.history.lock().insert(currency, samples);
    }
}

fn scripted<T>(value: Option<T>, what: &str) -> SourceResult<T> {
    value.ok_or_else(|| format!("scripted {} failure", what).into())
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn spot_prices(&self) -> SourceResult<SpotQuotes> {
        if let Some(gate) = &self.spot_gate {
            gate.notified().await;
        }
        let spot = *self.spot.lock();
        scripted(spot, "spot")
    }

    async fn recommended_fees(&self) -> SourceResult<RecommendedFees> {
        let fees = *self.fees.lock();
        scripted(fees, "fees")
    }

    async fn tip_height(&self) -> SourceResult<u64> {
        if self.hang_tip {
            std::future::pending::<()>().await;
        }
        let tip = *self.tip.lock();
        scripted(tip, "tip")
    }

    async fn mempool_tx_count(&self) -> SourceResult<i64> {
        let tx_count = *self.tx_count.lock();
        scripted(tx_count, "mempool")
    }

    async fn fear_greed(&self) -> SourceResult<FearGreedReading> {
        let reading = self.fear_greed.lock().clone();
        scripted(reading, "fear & greed")
    }

    async fn daily_history(&self, currency: Currency, _days: u32) -> SourceResult<Vec<(i64, f64)>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let samples = self.history.lock().get(&currency).cloned();
        scripted(samples, "history")
    }
}
