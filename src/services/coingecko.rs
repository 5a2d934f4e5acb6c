use chrono::DateTime;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// `/simple/price` body: coin id -> currency -> price
pub type SimplePrices = HashMap<String, HashMap<String, Value>>;

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    api_key_header: String,
    base_url: String,
    cache: Arc<Cache<String, Vec<(i64, f64)>>>,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

impl CoinGeckoService {
    pub fn new(
        api_key: Option<String>,
        api_key_header: String,
        base_url: String,
        timeout: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(32) // a handful of (coin, currency, window) combinations
            .time_to_live(Duration::from_secs(3600)) // 1 hour TTL
            .build();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            api_key_header,
            base_url,
            cache: Arc::new(cache),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url).header("accept", "application/json");
        match &self.api_key {
            Some(key) => request.header(self.api_key_header.as_str(), key),
            None => request,
        }
    }

    /// Current prices for every `ids` x `vs_currencies` pair.
    ///
    /// Values are returned as raw JSON so the caller decides what a usable
    /// price is.
    pub async fn get_simple_prices(
        &self,
        ids: &[&str],
        vs_currencies: &[&str],
    ) -> Result<SimplePrices, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/simple/price", self.base_url);
        let ids = ids.join(",");
        let vs_currencies = vs_currencies.join(",");

        tracing::debug!("Fetching simple prices for {} in {}", ids, vs_currencies);

        let response = self
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", vs_currencies.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("CoinGecko API error {}: {}", status, error_text).into());
        }

        let prices: SimplePrices = response.json().await?;
        Ok(prices)
    }

    /// Daily `(timestamp_ms, price)` samples for the trailing `days`.
    pub async fn get_token_market_chart(
        &self,
        coin_id: &str,
        currency: &str,
        days: u32,
    ) -> Result<Vec<(i64, f64)>, Box<dyn std::error::Error + Send + Sync>> {
        let cache_key = format!("{}_{}_{}", coin_id, currency, days);

        // Check cache first
        if let Some(cached_data) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached_data);
        }

        tracing::info!(
            "Fetching {} day market chart for {}/{} from CoinGecko",
            days,
            coin_id,
            currency
        );

        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);

        let response = self
            .get(&url)
            .query(&[
                ("vs_currency", currency),
                ("days", &days.to_string()),
                ("interval", "daily"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("CoinGecko API error {}: {}", status, error_text).into());
        }

        let data: MarketChartResponse = response.json().await?;
        let prices: Vec<(i64, f64)> = data
            .prices
            .into_iter()
            .map(|(timestamp_ms, price)| (timestamp_ms as i64, price))
            .collect();

        self.cache.insert(cache_key, prices.clone()).await;

        if let Some(last_price) = prices.last() {
            let last_date = DateTime::from_timestamp_millis(last_price.0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Invalid date".to_string());
            tracing::debug!(
                "Fetched {} prices for {}/{}, last: {} @ {}",
                prices.len(),
                coin_id,
                currency,
                last_price.1,
                last_date
            );
        }

        Ok(prices)
    }
}
