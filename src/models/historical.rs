use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::entities::daily_close_prices;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalPricesQuery {
    /// Lookback in days; defaults to the configured history window
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPriceEntry {
    pub date: NaiveDate,
    pub price_usd: f64,
    pub price_brl: Option<f64>,
}

impl From<daily_close_prices::Model> for HistoricalPriceEntry {
    fn from(close: daily_close_prices::Model) -> Self {
        Self {
            date: close.date,
            price_usd: close.price_usd.to_f64().unwrap_or(0.0),
            price_brl: close.price_brl.and_then(|p| p.to_f64()),
        }
    }
}
