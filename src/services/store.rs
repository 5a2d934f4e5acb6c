//! Persisted store for the dashboard snapshot and its history series.
//!
//! Two write capabilities are kept apart:
//! - `put_*` overwrites the "current" row for a key (prices, mempool snapshot,
//!   sentiment of the day).
//! - `append_*` only ever adds rows (global metrics, daily closes); daily closes
//!   are insert-if-absent so the first recorded close for a date is kept.
//!
//! Writes go through an in-process lock so two cycles never interleave on the
//! same rows; each cycle commits inside a single transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    Order, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::entities::{
    current_prices, daily_close_prices, fear_greed_history, global_metrics_history,
    mempool_snapshot, prelude::*,
};

/// SQLite caps bound parameters per statement; keep batches well under it
const INSERT_CHUNK_SIZE: usize = 100;

/// Pairs tracked in current_prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSymbol {
    BtcUsd,
    BtcBrl,
    UsdtBrl,
}

impl PriceSymbol {
    pub const ALL: [PriceSymbol; 3] = [
        PriceSymbol::BtcUsd,
        PriceSymbol::BtcBrl,
        PriceSymbol::UsdtBrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSymbol::BtcUsd => "BTC-USD",
            PriceSymbol::BtcBrl => "BTC-BRL",
            PriceSymbol::UsdtBrl => "USDT-BRL",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == symbol)
    }
}

/// Fields of the singleton mempool snapshot, minus bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct MempoolState {
    pub fastest_fee: i64,
    pub half_hour_fee: i64,
    pub hour_fee: i64,
    pub block_height: i64,
    pub tx_count: i64,
    pub calculated_supply: Decimal,
}

#[derive(Clone)]
pub struct SnapshotStore {
    db: DatabaseConnection,
    write_lock: Arc<Mutex<()>>,
}

impl SnapshotStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // ---- writes ----

    /// Commit one high-frequency cycle: the three quotes, the mempool snapshot
    /// and one global metric record, all or nothing.
    pub async fn commit_high_frequency(
        &self,
        observed_at: DateTime<Utc>,
        quotes: &[(PriceSymbol, Decimal)],
        mempool: &MempoolState,
        market_cap_usd: Decimal,
    ) -> Result<(), DbErr> {
        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;

        put_current_prices(&txn, quotes, observed_at).await?;
        put_mempool_snapshot(&txn, mempool, observed_at).await?;
        append_global_metric(&txn, market_cap_usd, observed_at).await?;

        txn.commit().await?;

        tracing::debug!(
            "Committed {} quotes, mempool snapshot at height {}, market cap {}",
            quotes.len(),
            mempool.block_height,
            market_cap_usd
        );
        Ok(())
    }

    /// Upsert the sentiment record for `date`.
    pub async fn put_fear_greed(
        &self,
        date: NaiveDate,
        value: i32,
        classification: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let _guard = self.write_lock.lock().await;

        let record = fear_greed_history::ActiveModel {
            date: Set(date),
            value: Set(value),
            classification: Set(classification.to_string()),
            last_updated: Set(observed_at),
        };

        FearGreedHistory::insert(record)
            .on_conflict(
                OnConflict::column(fear_greed_history::Column::Date)
                    .update_columns([
                        fear_greed_history::Column::Value,
                        fear_greed_history::Column::Classification,
                        fear_greed_history::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    /// Insert daily closes whose date is not stored yet. Existing dates are
    /// left untouched. Returns the number of new rows.
    pub async fn append_daily_closes_if_absent(
        &self,
        closes: &[daily_close_prices::Model],
    ) -> Result<u64, DbErr> {
        if closes.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await?;
        let mut inserted = 0;

        for chunk in closes.chunks(INSERT_CHUNK_SIZE) {
            let rows = chunk.iter().map(|close| daily_close_prices::ActiveModel {
                date: Set(close.date),
                price_usd: Set(close.price_usd),
                price_brl: Set(close.price_brl),
            });

            inserted += DailyClosePrices::insert_many(rows)
                .on_conflict(
                    OnConflict::column(daily_close_prices::Column::Date)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(inserted)
    }

    // ---- reads ----

    pub async fn current_prices(&self) -> Result<Vec<current_prices::Model>, DbErr> {
        CurrentPrices::find().all(&self.db).await
    }

    pub async fn mempool_snapshot(&self) -> Result<Option<mempool_snapshot::Model>, DbErr> {
        MempoolSnapshot::find_by_id(mempool_snapshot::SNAPSHOT_ID)
            .one(&self.db)
            .await
    }

    pub async fn latest_fear_greed(&self) -> Result<Option<fear_greed_history::Model>, DbErr> {
        FearGreedHistory::find()
            .order_by(fear_greed_history::Column::Date, Order::Desc)
            .limit(1)
            .one(&self.db)
            .await
    }

    pub async fn latest_global_metric(
        &self,
    ) -> Result<Option<global_metrics_history::Model>, DbErr> {
        GlobalMetricsHistory::find()
            .order_by(global_metrics_history::Column::ObservedAt, Order::Desc)
            .order_by(global_metrics_history::Column::Id, Order::Desc)
            .limit(1)
            .one(&self.db)
            .await
    }

    /// USD closes, newest first, at most `limit` of them
    pub async fn recent_usd_closes(&self, limit: u64) -> Result<Vec<Decimal>, DbErr> {
        let rows = DailyClosePrices::find()
            .order_by(daily_close_prices::Column::Date, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|row| row.price_usd).collect())
    }

    /// Daily closes on or after `start`, oldest first
    pub async fn daily_closes_since(
        &self,
        start: NaiveDate,
    ) -> Result<Vec<daily_close_prices::Model>, DbErr> {
        DailyClosePrices::find()
            .filter(daily_close_prices::Column::Date.gte(start))
            .order_by(daily_close_prices::Column::Date, Order::Asc)
            .all(&self.db)
            .await
    }

    pub async fn global_metric_count(&self) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;
        GlobalMetricsHistory::find().count(&self.db).await
    }
}

async fn put_current_prices<C: ConnectionTrait>(
    conn: &C,
    quotes: &[(PriceSymbol, Decimal)],
    observed_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    if quotes.is_empty() {
        return Ok(());
    }

    let rows = quotes.iter().map(|(symbol, price)| current_prices::ActiveModel {
        symbol: Set(symbol.as_str().to_string()),
        price: Set(*price),
        last_updated: Set(observed_at),
    });

    CurrentPrices::insert_many(rows)
        .on_conflict(
            OnConflict::column(current_prices::Column::Symbol)
                .update_columns([
                    current_prices::Column::Price,
                    current_prices::Column::LastUpdated,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

async fn put_mempool_snapshot<C: ConnectionTrait>(
    conn: &C,
    mempool: &MempoolState,
    observed_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let snapshot = mempool_snapshot::ActiveModel {
        id: Set(mempool_snapshot::SNAPSHOT_ID),
        fastest_fee: Set(mempool.fastest_fee),
        half_hour_fee: Set(mempool.half_hour_fee),
        hour_fee: Set(mempool.hour_fee),
        block_height: Set(mempool.block_height),
        tx_count: Set(mempool.tx_count),
        calculated_supply: Set(mempool.calculated_supply),
        last_updated: Set(observed_at),
    };

    MempoolSnapshot::insert(snapshot)
        .on_conflict(
            OnConflict::column(mempool_snapshot::Column::Id)
                .update_columns([
                    mempool_snapshot::Column::FastestFee,
                    mempool_snapshot::Column::HalfHourFee,
                    mempool_snapshot::Column::HourFee,
                    mempool_snapshot::Column::BlockHeight,
                    mempool_snapshot::Column::TxCount,
                    mempool_snapshot::Column::CalculatedSupply,
                    mempool_snapshot::Column::LastUpdated,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

async fn append_global_metric<C: ConnectionTrait>(
    conn: &C,
    market_cap_usd: Decimal,
    observed_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let record = global_metrics_history::ActiveModel {
        observed_at: Set(observed_at),
        market_cap_usd: Set(market_cap_usd),
        ..Default::default()
    };

    GlobalMetricsHistory::insert(record)
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for symbol in PriceSymbol::ALL {
            assert_eq!(PriceSymbol::from_symbol(symbol.as_str()), Some(symbol));
        }
        assert_eq!(PriceSymbol::from_symbol("ETH-USD"), None);
    }
}
