use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::refresh::Snapshot;
use crate::services::store::PriceSymbol;

/// `/api/data` body. Every nested field is nullable; the nested objects are
/// always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Unix ms of the last committed high-frequency cycle, or now when none
    pub last_update_timestamp: i64,
    /// Milliseconds until the next cycle is expected; negative when overdue
    pub time_until_next_update: i64,
    pub prices: PricesData,
    pub mempool: MempoolData,
    pub fear_greed: FearGreedData,
    pub global_metrics: GlobalMetricsData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricesData {
    pub btc_usd: Option<f64>,
    pub btc_brl: Option<f64>,
    pub usdt_brl: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MempoolData {
    pub fastest_fee: Option<i64>,
    pub half_hour_fee: Option<i64>,
    pub hour_fee: Option<i64>,
    pub block_height: Option<i64>,
    pub tx_count: Option<i64>,
    pub calculated_supply: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FearGreedData {
    pub value: Option<i32>,
    pub classification: Option<String>,
    /// Unix ms
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMetricsData {
    pub market_cap_usd: Option<f64>,
    pub mayer_multiple: Option<f64>,
}

impl DashboardResponse {
    pub fn from_snapshot(
        snapshot: Snapshot,
        update_interval: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let last_update = snapshot.last_updated.unwrap_or(now);
        let time_until_next_update = snapshot
            .time_until_next_update
            .map(|remaining| remaining.num_milliseconds())
            .unwrap_or_else(|| i64::try_from(update_interval.as_millis()).unwrap_or(i64::MAX));

        let price = |symbol: PriceSymbol| snapshot.prices.get(&symbol).and_then(|p| p.to_f64());

        let prices = PricesData {
            btc_usd: price(PriceSymbol::BtcUsd),
            btc_brl: price(PriceSymbol::BtcBrl),
            usdt_brl: price(PriceSymbol::UsdtBrl),
        };

        let mempool = snapshot
            .mempool
            .as_ref()
            .map(|m| MempoolData {
                fastest_fee: Some(m.fastest_fee),
                half_hour_fee: Some(m.half_hour_fee),
                hour_fee: Some(m.hour_fee),
                block_height: Some(m.block_height),
                tx_count: Some(m.tx_count),
                calculated_supply: m.calculated_supply.to_f64(),
            })
            .unwrap_or_default();

        let fear_greed = snapshot
            .fear_greed
            .map(|record| FearGreedData {
                value: Some(record.value),
                classification: Some(record.classification),
                last_updated: Some(record.last_updated.timestamp_millis()),
            })
            .unwrap_or_default();

        Self {
            last_update_timestamp: last_update.timestamp_millis(),
            time_until_next_update,
            prices,
            mempool,
            fear_greed,
            global_metrics: GlobalMetricsData {
                market_cap_usd: snapshot.market_cap_usd.and_then(|m| m.to_f64()),
                mayer_multiple: snapshot.mayer_multiple.and_then(|m| m.to_f64()),
            },
        }
    }
}
