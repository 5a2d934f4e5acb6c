//! External market data collaborators behind one trait, so the refresh
//! coordinator can be driven by the live HTTP clients or by a scripted source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::coingecko::CoinGeckoService;
use crate::services::fear_greed::{FearGreedReading, FearGreedService};
use crate::services::mempool::{MempoolService, RecommendedFees};

pub type SourceResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const BITCOIN_ID: &str = "bitcoin";
const TETHER_ID: &str = "tether";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Brl,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Brl => "brl",
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(Currency::Usd),
            "brl" => Ok(Currency::Brl),
            other => Err(format!("Unsupported currency: {}", other)),
        }
    }
}

/// Spot prices as reported. `None` means the field was absent or not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpotQuotes {
    pub btc_usd: Option<f64>,
    pub btc_brl: Option<f64>,
    pub usdt_brl: Option<f64>,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn spot_prices(&self) -> SourceResult<SpotQuotes>;

    async fn recommended_fees(&self) -> SourceResult<RecommendedFees>;

    async fn tip_height(&self) -> SourceResult<u64>;

    async fn mempool_tx_count(&self) -> SourceResult<i64>;

    async fn fear_greed(&self) -> SourceResult<FearGreedReading>;

    /// Ordered `(timestamp_ms, price)` BTC samples at daily granularity
    async fn daily_history(&self, currency: Currency, days: u32) -> SourceResult<Vec<(i64, f64)>>;
}

/// Live sources: CoinGecko, mempool.space and alternative.me
#[derive(Clone)]
pub struct HttpMarketDataSource {
    coingecko: CoinGeckoService,
    mempool: MempoolService,
    fear_greed: FearGreedService,
}

impl HttpMarketDataSource {
    pub fn new(
        coingecko: CoinGeckoService,
        mempool: MempoolService,
        fear_greed: FearGreedService,
    ) -> Self {
        Self {
            coingecko,
            mempool,
            fear_greed,
        }
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn spot_prices(&self) -> SourceResult<SpotQuotes> {
        let prices = self
            .coingecko
            .get_simple_prices(&[BITCOIN_ID, TETHER_ID], &["usd", "brl"])
            .await?;

        let lookup = |coin: &str, currency: &str| {
            prices
                .get(coin)
                .and_then(|by_currency| by_currency.get(currency))
                .and_then(|value| value.as_f64())
        };

        Ok(SpotQuotes {
            btc_usd: lookup(BITCOIN_ID, "usd"),
            btc_brl: lookup(BITCOIN_ID, "brl"),
            usdt_brl: lookup(TETHER_ID, "brl"),
        })
    }

    async fn recommended_fees(&self) -> SourceResult<RecommendedFees> {
        self.mempool.get_recommended_fees().await
    }

    async fn tip_height(&self) -> SourceResult<u64> {
        self.mempool.get_tip_height().await
    }

    async fn mempool_tx_count(&self) -> SourceResult<i64> {
        self.mempool.get_mempool_tx_count().await
    }

    async fn fear_greed(&self) -> SourceResult<FearGreedReading> {
        self.fear_greed.get_latest().await
    }

    async fn daily_history(&self, currency: Currency, days: u32) -> SourceResult<Vec<(i64, f64)>> {
        self.coingecko
            .get_token_market_chart(BITCOIN_ID, currency.as_str(), days)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parsing() {
        assert_eq!("USD".parse::<Currency>(), Ok(Currency::Usd));
        assert_eq!("brl".parse::<Currency>(), Ok(Currency::Brl));
        assert!("eur".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_serde() {
        assert_eq!(serde_json::to_string(&Currency::Brl).unwrap(), "\"brl\"");
        let parsed: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(parsed, Currency::Usd);
    }
}
