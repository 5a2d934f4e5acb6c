//! Runtime configuration read from the environment (after `.env` is loaded).

use chrono::NaiveTime;
use std::env;
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_UPDATE_INTERVAL: &str = "UPDATE_INTERVAL_SECONDS";
pub const ENV_DAILY_SYNC_TIME: &str = "DAILY_SYNC_TIME";
pub const ENV_BACKFILL_DAYS: &str = "BACKFILL_DAYS";
pub const ENV_HISTORY_WINDOW_DAYS: &str = "HISTORY_WINDOW_DAYS";
pub const ENV_FETCH_TIMEOUT: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
pub const ENV_COINGECKO_API_KEY_HEADER: &str = "COINGECKO_API_KEY_HEADER";
pub const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";
pub const ENV_MEMPOOL_BASE_URL: &str = "MEMPOOL_BASE_URL";
pub const ENV_FEAR_GREED_URL: &str = "FEAR_GREED_URL";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bitpanel.sqlite?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// Default high-frequency interval (10 minutes)
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_BACKFILL_DAYS: u32 = 365;
pub const DEFAULT_HISTORY_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_COINGECKO_API_KEY_HEADER: &str = "x-cg-demo-api-key";
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_MEMPOOL_BASE_URL: &str = "https://mempool.space/api";
pub const DEFAULT_FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";

/// Local time of the daily cycle (00:15)
pub fn default_daily_sync_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 15, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub refresh: RefreshConfig,
    pub history_window_days: u32,
    pub coingecko_api_key: Option<String>,
    pub coingecko_api_key_header: String,
    pub coingecko_base_url: String,
    pub mempool_base_url: String,
    pub fear_greed_url: String,
}

/// Knobs consumed by the refresh coordinator and its jobs
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub update_interval: Duration,
    pub daily_sync_time: NaiveTime,
    pub backfill_days: u32,
    pub fetch_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(DEFAULT_UPDATE_INTERVAL_SECS),
            daily_sync_time: default_daily_sync_time(),
            backfill_days: DEFAULT_BACKFILL_DAYS,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let update_interval_secs =
            parse_or_default(&lookup, ENV_UPDATE_INTERVAL, DEFAULT_UPDATE_INTERVAL_SECS);
        let update_interval_secs = if update_interval_secs == 0 {
            tracing::warn!(
                "{} must be positive, using {}s",
                ENV_UPDATE_INTERVAL,
                DEFAULT_UPDATE_INTERVAL_SECS
            );
            DEFAULT_UPDATE_INTERVAL_SECS
        } else {
            update_interval_secs
        };

        let daily_sync_time = match lookup(ENV_DAILY_SYNC_TIME) {
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
                tracing::warn!("Invalid {} '{}', expected HH:MM", ENV_DAILY_SYNC_TIME, raw);
                default_daily_sync_time()
            }),
            None => default_daily_sync_time(),
        };

        let coingecko_api_key = lookup(ENV_COINGECKO_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Self {
            database_url: lookup(ENV_DATABASE_URL)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            refresh: RefreshConfig {
                update_interval: Duration::from_secs(update_interval_secs),
                daily_sync_time,
                backfill_days: parse_or_default(&lookup, ENV_BACKFILL_DAYS, DEFAULT_BACKFILL_DAYS),
                fetch_timeout: Duration::from_secs(parse_or_default(
                    &lookup,
                    ENV_FETCH_TIMEOUT,
                    DEFAULT_FETCH_TIMEOUT_SECS,
                )),
            },
            history_window_days: parse_or_default(
                &lookup,
                ENV_HISTORY_WINDOW_DAYS,
                DEFAULT_HISTORY_WINDOW_DAYS,
            ),
            coingecko_api_key,
            coingecko_api_key_header: lookup(ENV_COINGECKO_API_KEY_HEADER)
                .unwrap_or_else(|| DEFAULT_COINGECKO_API_KEY_HEADER.to_string()),
            coingecko_base_url: lookup(ENV_COINGECKO_BASE_URL)
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
            mempool_base_url: lookup(ENV_MEMPOOL_BASE_URL)
                .unwrap_or_else(|| DEFAULT_MEMPOOL_BASE_URL.to_string()),
            fear_greed_url: lookup(ENV_FEAR_GREED_URL)
                .unwrap_or_else(|| DEFAULT_FEAR_GREED_URL.to_string()),
        }
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} '{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
