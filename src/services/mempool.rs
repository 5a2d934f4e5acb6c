//! mempool.space client: fee tiers, chain tip and mempool size.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Recommended fee tiers in sat/vByte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: i64,
    pub half_hour_fee: i64,
    pub hour_fee: i64,
}

#[derive(Debug, Deserialize)]
struct MempoolStats {
    count: i64,
}

#[derive(Clone)]
pub struct MempoolService {
    client: Client,
    base_url: String,
}

impl MempoolService {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url }
    }

    pub async fn get_recommended_fees(
        &self,
    ) -> Result<RecommendedFees, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/v1/fees/recommended", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(format!("mempool fees API error: {}", response.status()).into());
        }

        Ok(response.json().await?)
    }

    /// Chain tip height. The endpoint answers with a bare integer body.
    pub async fn get_tip_height(&self) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/blocks/tip/height", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(format!("mempool tip API error: {}", response.status()).into());
        }

        let body = response.text().await?;
        parse_tip_height(&body)
    }

    /// Number of unconfirmed transactions
    pub async fn get_mempool_tx_count(
        &self,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/mempool", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(format!("mempool stats API error: {}", response.status()).into());
        }

        let stats: MempoolStats = response.json().await?;
        Ok(stats.count)
    }
}

fn parse_tip_height(body: &str) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
    body.trim()
        .parse::<u64>()
        .map_err(|e| format!("Invalid tip height '{}': {}", body.trim(), e).into())
}
