//! Refresh coordinator
//!
//! Owns every write into the snapshot store. Two cadences feed it:
//! - the high-frequency cycle (spot prices, fees, chain tip, mempool size),
//! - the daily cycle (sentiment index and the last completed day's close),
//!
//! plus a one-time history backfill at startup. The first run of all three is
//! joined behind a readiness barrier: a reader that arrives before the mempool
//! snapshot was ever written waits for the barrier instead of getting an empty
//! snapshot. Once a snapshot exists readers never wait again.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sea_orm::DbErr;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::RefreshConfig;
use crate::entities::{daily_close_prices, fear_greed_history, mempool_snapshot};
use crate::services::market_data::{Currency, MarketDataSource, SourceResult};
use crate::services::metrics::{self, MAYER_WINDOW};
use crate::services::store::{MempoolState, PriceSymbol, SnapshotStore};
use crate::services::supply::circulating_supply;
use crate::services::sync_status::{self, BACKFILL_MIN_INTERVAL_SECS, jobs};

/// Days requested by the daily close cycle; yesterday plus today's partial day
const DAILY_CLOSE_WINDOW_DAYS: u32 = 2;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("{collaborator} returned a missing or non-numeric {field}")]
    InvalidField {
        collaborator: &'static str,
        field: &'static str,
    },

    #[error("{collaborator} fetch failed: {error}")]
    Fetch {
        collaborator: &'static str,
        error: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{collaborator} fetch timed out after {secs}s")]
    Timeout {
        collaborator: &'static str,
        secs: u64,
    },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// One-shot "initial load finished" signal
#[derive(Clone)]
pub struct ReadinessBarrier {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Release every current and future waiter. Idempotent.
    pub fn resolve(&self) {
        self.tx.send_replace(true);
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once resolved
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

/// Everything the dashboard read returns, straight from the last committed
/// cycle. Absent values stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub last_updated: Option<DateTime<Utc>>,
    /// Time left until the next high-frequency cycle is expected; negative
    /// when that cycle is overdue
    pub time_until_next_update: Option<chrono::Duration>,
    pub prices: HashMap<PriceSymbol, Decimal>,
    pub mempool: Option<mempool_snapshot::Model>,
    pub fear_greed: Option<fear_greed_history::Model>,
    pub market_cap_usd: Option<Decimal>,
    pub mayer_multiple: Option<Decimal>,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    store: SnapshotStore,
    source: Arc<dyn MarketDataSource>,
    config: RefreshConfig,
    ready: ReadinessBarrier,
}

impl RefreshCoordinator {
    pub fn new(
        store: SnapshotStore,
        source: Arc<dyn MarketDataSource>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            ready: ReadinessBarrier::new(),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn readiness(&self) -> &ReadinessBarrier {
        &self.ready
    }

    /// Run the first high-frequency cycle, daily cycle and backfill
    /// concurrently, then resolve the readiness barrier whatever their outcome.
    pub async fn initial_load(&self) {
        tracing::info!("Starting initial load (high-frequency, daily, backfill)");

        let (high_frequency, daily, backfill) = tokio::join!(
            self.run_high_frequency_cycle(),
            self.run_daily_cycle(),
            self.run_backfill(),
        );

        if let Err(e) = &high_frequency {
            tracing::error!("Initial high-frequency cycle failed: {}", e);
        }
        if let Err(e) = &daily {
            tracing::error!("Initial daily cycle failed: {}", e);
        }
        if let Err(e) = &backfill {
            tracing::error!("Initial backfill failed: {}", e);
        }

        self.ready.resolve();
        tracing::info!("Initial load finished, readers released");
    }

    // ---- high-frequency cadence ----

    /// Fetch the four live sources concurrently and commit prices, mempool
    /// snapshot and a market cap record in one transaction. Any failed fetch
    /// or unusable price aborts the cycle before anything is written.
    pub async fn run_high_frequency_cycle(&self) -> Result<(), RefreshError> {
        let result = self.high_frequency_cycle().await;
        self.record(jobs::HIGH_FREQUENCY, &result).await;
        result
    }

    async fn high_frequency_cycle(&self) -> Result<(), RefreshError> {
        tracing::info!("Starting high-frequency refresh");

        let (quotes, fees, height, tx_count) = tokio::try_join!(
            self.fetch("spot prices", self.source.spot_prices()),
            self.fetch("fee estimates", self.source.recommended_fees()),
            self.fetch("chain tip", self.source.tip_height()),
            self.fetch("mempool stats", self.source.mempool_tx_count()),
        )?;

        let btc_usd = required_price(PriceSymbol::BtcUsd, quotes.btc_usd)?;
        let btc_brl = required_price(PriceSymbol::BtcBrl, quotes.btc_brl)?;
        let usdt_brl = required_price(PriceSymbol::UsdtBrl, quotes.usdt_brl)?;

        let block_height = i64::try_from(height).map_err(|_| RefreshError::InvalidField {
            collaborator: "chain tip",
            field: "block height",
        })?;
        let supply = circulating_supply(height);
        let market_cap = metrics::market_cap(btc_usd, supply);

        let mempool = MempoolState {
            fastest_fee: fees.fastest_fee,
            half_hour_fee: fees.half_hour_fee,
            hour_fee: fees.hour_fee,
            block_height,
            tx_count,
            calculated_supply: supply,
        };

        self.store
            .commit_high_frequency(
                Utc::now(),
                &[
                    (PriceSymbol::BtcUsd, btc_usd),
                    (PriceSymbol::BtcBrl, btc_brl),
                    (PriceSymbol::UsdtBrl, usdt_brl),
                ],
                &mempool,
                market_cap,
            )
            .await?;

        tracing::info!(
            "High-frequency refresh complete: BTC-USD {}, height {}, supply {}",
            btc_usd,
            block_height,
            supply
        );
        Ok(())
    }

    // ---- daily cadence ----

    /// Sentiment upsert and daily close append, run side by side. Both are
    /// attempted even if one fails; the first error is returned.
    pub async fn run_daily_cycle(&self) -> Result<(), RefreshError> {
        let (fear_greed, daily_close) =
            tokio::join!(self.run_fear_greed_cycle(), self.run_daily_close_cycle());

        fear_greed?;
        daily_close?;
        Ok(())
    }

    pub async fn run_fear_greed_cycle(&self) -> Result<(), RefreshError> {
        let result = self.fear_greed_cycle().await;
        self.record(jobs::FEAR_GREED, &result).await;
        result
    }

    async fn fear_greed_cycle(&self) -> Result<(), RefreshError> {
        let reading = self
            .fetch("sentiment index", self.source.fear_greed())
            .await?;

        let now = Utc::now();
        let today = now.date_naive();
        self.store
            .put_fear_greed(today, reading.value, &reading.classification, now)
            .await?;

        tracing::info!(
            "Fear & Greed for {}: {} ({})",
            today,
            reading.value,
            reading.classification
        );
        Ok(())
    }

    /// Append the most recent completed day's close. Returns 1 if it was new,
    /// 0 if that date was already stored or no completed day was reported.
    pub async fn run_daily_close_cycle(&self) -> Result<u64, RefreshError> {
        let result = self.daily_close_cycle().await;
        self.record(jobs::DAILY_CLOSE, &result).await;
        result
    }

    async fn daily_close_cycle(&self) -> Result<u64, RefreshError> {
        let merged = self.fetch_merged_history(DAILY_CLOSE_WINDOW_DAYS).await?;
        let today = Utc::now().date_naive();

        let Some(close) = latest_completed_close(&merged, today) else {
            tracing::warn!("No completed day with both USD and BRL closes before {}", today);
            return Ok(0);
        };

        let date = close.date;
        let inserted = self.store.append_daily_closes_if_absent(&[close]).await?;

        if inserted > 0 {
            tracing::info!("Stored daily close for {}", date);
        } else {
            tracing::info!("Daily close for {} already stored, kept existing row", date);
        }
        Ok(inserted)
    }

    // ---- startup backfill ----

    /// Fill the trailing history window. Skipped when a backfill succeeded
    /// within the last 24 hours. Returns the number of new rows.
    pub async fn run_backfill(&self) -> Result<u64, RefreshError> {
        let min_interval = chrono::Duration::seconds(BACKFILL_MIN_INTERVAL_SECS);
        if !sync_status::should_sync(self.store.db(), jobs::HISTORY_BACKFILL, min_interval).await? {
            return Ok(0);
        }

        let result = self.backfill().await;
        self.record(jobs::HISTORY_BACKFILL, &result).await;
        result
    }

    async fn backfill(&self) -> Result<u64, RefreshError> {
        tracing::info!("Backfilling {} days of daily closes", self.config.backfill_days);

        let merged = self.fetch_merged_history(self.config.backfill_days).await?;
        let inserted = self
            .store
            .append_daily_closes_if_absent(&merged.into_values().collect::<Vec<_>>())
            .await?;

        tracing::info!("Backfill complete: {} new daily closes", inserted);
        Ok(inserted)
    }

    async fn fetch_merged_history(
        &self,
        days: u32,
    ) -> Result<BTreeMap<NaiveDate, daily_close_prices::Model>, RefreshError> {
        let (usd, brl) = tokio::try_join!(
            self.fetch("USD history", self.source.daily_history(Currency::Usd, days)),
            self.fetch("BRL history", self.source.daily_history(Currency::Brl, days)),
        )?;

        Ok(merge_daily_closes(&usd, &brl))
    }

    // ---- reads ----

    /// Last committed snapshot. Waits for the initial load only while no
    /// mempool snapshot was ever written.
    pub async fn get_snapshot(&self) -> Result<Snapshot, DbErr> {
        let mut mempool = self.store.mempool_snapshot().await?;

        // Re-read after the barrier: the load may have committed since the first read
        if mempool.is_none() {
            if !self.ready.is_ready() {
                tracing::debug!("No snapshot stored yet, waiting for initial load");
            }
            self.ready.wait().await;
            mempool = self.store.mempool_snapshot().await?;
        }

        let prices: HashMap<PriceSymbol, Decimal> = self
            .store
            .current_prices()
            .await?
            .into_iter()
            .filter_map(|row| PriceSymbol::from_symbol(&row.symbol).map(|s| (s, row.price)))
            .collect();

        let fear_greed = self.store.latest_fear_greed().await?;
        let market_cap_usd = self
            .store
            .latest_global_metric()
            .await?
            .map(|record| record.market_cap_usd);

        let closes = self.store.recent_usd_closes(MAYER_WINDOW as u64).await?;
        let mayer_multiple =
            metrics::mayer_multiple(prices.get(&PriceSymbol::BtcUsd).copied(), &closes);

        let last_updated = mempool.as_ref().map(|snapshot| snapshot.last_updated);
        let time_until_next_update =
            last_updated.map(|at| time_until_next(at, self.config.update_interval, Utc::now()));

        Ok(Snapshot {
            last_updated,
            time_until_next_update,
            prices,
            mempool,
            fear_greed,
            market_cap_usd,
            mayer_multiple,
        })
    }

    /// Daily closes for the trailing `days`, oldest first
    pub async fn historical_series(
        &self,
        days: u32,
    ) -> Result<Vec<daily_close_prices::Model>, DbErr> {
        let start = window_start(Utc::now().date_naive(), days);
        self.store.daily_closes_since(start).await
    }

    // ---- helpers ----

    async fn fetch<T, F>(&self, collaborator: &'static str, request: F) -> Result<T, RefreshError>
    where
        F: Future<Output = SourceResult<T>>,
    {
        match tokio::time::timeout(self.config.fetch_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(RefreshError::Fetch {
                collaborator,
                error,
            }),
            Err(_) => Err(RefreshError::Timeout {
                collaborator,
                secs: self.config.fetch_timeout.as_secs(),
            }),
        }
    }

    async fn record<T>(&self, job_name: &str, result: &Result<T, RefreshError>) {
        let bookkeeping = match result {
            Ok(_) => sync_status::record_success(self.store.db(), job_name).await,
            Err(e) => sync_status::record_failure(self.store.db(), job_name, &e.to_string()).await,
        };

        if let Err(e) = bookkeeping {
            tracing::warn!("[{}] Failed to update sync status: {}", job_name, e);
        }
    }
}

fn required_price(symbol: PriceSymbol, value: Option<f64>) -> Result<Decimal, RefreshError> {
    value
        .filter(|price| price.is_finite() && *price > 0.0)
        .and_then(Decimal::from_f64)
        .ok_or(RefreshError::InvalidField {
            collaborator: "spot prices",
            field: symbol.as_str(),
        })
}

/// Key both series by UTC calendar day (a later sample on the same day
/// replaces an earlier one) and keep only days present in both.
pub fn merge_daily_closes(
    usd: &[(i64, f64)],
    brl: &[(i64, f64)],
) -> BTreeMap<NaiveDate, daily_close_prices::Model> {
    let usd_by_day = by_day(usd);
    let brl_by_day = by_day(brl);

    usd_by_day
        .into_iter()
        .filter_map(|(date, price_usd)| {
            let price_brl = *brl_by_day.get(&date)?;
            Some((
                date,
                daily_close_prices::Model {
                    date,
                    price_usd,
                    price_brl: Some(price_brl),
                },
            ))
        })
        .collect()
}

fn by_day(samples: &[(i64, f64)]) -> BTreeMap<NaiveDate, Decimal> {
    let mut by_day = BTreeMap::new();
    for &(timestamp_ms, price) in samples {
        let Some(at) = DateTime::<Utc>::from_timestamp_millis(timestamp_ms) else {
            continue;
        };
        if !price.is_finite() || price <= 0.0 {
            continue;
        }
        if let Some(price) = Decimal::from_f64(price) {
            by_day.insert(at.date_naive(), price);
        }
    }
    by_day
}

/// Latest merged close dated strictly before `today`
pub fn latest_completed_close(
    merged: &BTreeMap<NaiveDate, daily_close_prices::Model>,
    today: NaiveDate,
) -> Option<daily_close_prices::Model> {
    merged
        .range(..today)
        .next_back()
        .map(|(_, close)| close.clone())
}

/// First date of a `days`-long window ending `today`, never earlier than
/// the genesis block's date.
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    let genesis = NaiveDate::from_ymd_opt(2009, 1, 3).unwrap_or(NaiveDate::MIN);
    today
        .checked_sub_signed(chrono::Duration::days(i64::from(days)))
        .map_or(genesis, |start| start.max(genesis))
}

/// `last_updated + interval - now`
pub fn time_until_next(
    last_updated: DateTime<Utc>,
    interval: std::time::Duration,
    now: DateTime<Utc>,
) -> chrono::Duration {
    let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::zero());
    last_updated + interval - now
}
