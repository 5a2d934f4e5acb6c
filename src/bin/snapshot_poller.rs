//! Headless dashboard client: polls `/api/data` on the server's own schedule
//! and logs each snapshot.
//!
//! Usage: snapshot_poller [base_url]   (default http://localhost:3000)

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bitpanel_backend::models::dashboard::DashboardResponse;
use bitpanel_backend::services::metrics::sats_to_fiat;
use bitpanel_backend::services::poll_scheduler::{PollPolicy, PollScheduler};

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const SATS_SAMPLE: i64 = 1_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bitpanel_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = env::args().nth(1).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let url = format!("{}/api/data", base_url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let scheduler = PollScheduler::new(PollPolicy::default());

    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    tx.send(())?;

    tracing::info!("Polling {}", url);

    loop {
        tokio::select! {
            Some(()) = rx.recv() => {}
            _ = tokio::signal::ctrl_c() => {
                scheduler.cancel();
                tracing::info!("Stopping poller");
                break;
            }
        }

        let tick = tx.clone();
        let fire = move || async move {
            let _ = tick.send(());
        };

        match poll_once(&client, &url).await {
            Ok(hint_ms) => {
                scheduler.schedule_from_hint(hint_ms, fire);
            }
            Err(e) => {
                tracing::warn!(
                    "Request failed, retrying in {:?}: {}",
                    scheduler.policy().retry_delay,
                    e
                );
                scheduler.schedule_retry(fire);
            }
        }
    }

    Ok(())
}

/// Fetch and log one snapshot. Returns the server's next-update hint.
async fn poll_once(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<i64>, Box<dyn std::error::Error + Send + Sync>> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(format!("server returned {}", response.status()).into());
    }

    let body: Value = response.json().await?;
    let hint_ms = body.get("timeUntilNextUpdate").and_then(Value::as_i64);

    match serde_json::from_value::<DashboardResponse>(body) {
        Ok(snapshot) => log_snapshot(&snapshot),
        Err(e) => tracing::warn!("Unexpected snapshot shape: {}", e),
    }

    Ok(hint_ms)
}

fn log_snapshot(snapshot: &DashboardResponse) {
    let btc_usd = snapshot.prices.btc_usd;
    let sats_in_usd = btc_usd
        .and_then(Decimal::from_f64)
        .map(|price| sats_to_fiat(Decimal::from(SATS_SAMPLE), price).round_dp(4));

    tracing::info!(
        "BTC-USD {:?} | BTC-BRL {:?} | USDT-BRL {:?} | {} sats = {:?} USD",
        btc_usd,
        snapshot.prices.btc_brl,
        snapshot.prices.usdt_brl,
        SATS_SAMPLE,
        sats_in_usd
    );
    tracing::info!(
        "Height {:?} | fees {:?}/{:?}/{:?} sat/vB | mempool {:?} tx | supply {:?}",
        snapshot.mempool.block_height,
        snapshot.mempool.fastest_fee,
        snapshot.mempool.half_hour_fee,
        snapshot.mempool.hour_fee,
        snapshot.mempool.tx_count,
        snapshot.mempool.calculated_supply
    );
    tracing::info!(
        "Fear & Greed {:?} ({}) | market cap {:?} | Mayer {:?}",
        snapshot.fear_greed.value,
        snapshot.fear_greed.classification.as_deref().unwrap_or("n/a"),
        snapshot.global_metrics.market_cap_usd,
        snapshot.global_metrics.mayer_multiple
    );
}
