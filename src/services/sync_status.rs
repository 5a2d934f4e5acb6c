//! Sync status bookkeeping for the refresh jobs
//!
//! Records last attempt/success per job so restarts can skip work that
//! succeeded recently and operators can see which source is failing.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};

/// Job names for tracking sync status
pub mod jobs {
    pub const HIGH_FREQUENCY: &str = "high_frequency_sync";
    pub const FEAR_GREED: &str = "fear_greed_sync";
    pub const DAILY_CLOSE: &str = "daily_close_sync";
    pub const HISTORY_BACKFILL: &str = "history_backfill";
}

/// Minimum age of the last successful backfill before it runs again (24 hours)
pub const BACKFILL_MIN_INTERVAL_SECS: i64 = 86400;

/// Returns true when the job never succeeded or last succeeded at least
/// `min_interval` ago.
pub async fn should_sync(
    db: &DatabaseConnection,
    job_name: &str,
    min_interval: Duration,
) -> Result<bool, DbErr> {
    let status = SyncStatus::find_by_id(job_name.to_string()).one(db).await?;

    let Some(last_success) = status.and_then(|record| record.last_success_at) else {
        tracing::info!("[{}] No previous successful sync, will sync", job_name);
        return Ok(true);
    };

    let elapsed = Utc::now().signed_duration_since(last_success);
    if elapsed >= min_interval {
        tracing::info!(
            "[{}] Last sync was {}s ago (min: {}s), will sync",
            job_name,
            elapsed.num_seconds(),
            min_interval.num_seconds()
        );
        Ok(true)
    } else {
        tracing::info!(
            "[{}] Skipping sync - last sync was {}s ago, next sync in {}s",
            job_name,
            elapsed.num_seconds(),
            (min_interval - elapsed).num_seconds()
        );
        Ok(false)
    }
}

/// Record a successful sync
pub async fn record_success(db: &DatabaseConnection, job_name: &str) -> Result<(), DbErr> {
    let now = Utc::now();

    match SyncStatus::find_by_id(job_name.to_string()).one(db).await? {
        Some(record) => {
            let success_count = record.success_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.success_count = Set(success_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                success_count: Set(1),
                error_count: Set(0),
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded successful sync", job_name);
    Ok(())
}

/// Record a failed sync attempt
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
) -> Result<(), DbErr> {
    let now = Utc::now();

    match SyncStatus::find_by_id(job_name.to_string()).one(db).await? {
        Some(record) => {
            let error_count = record.error_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                success_count: Set(0),
                error_count: Set(1),
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded failed sync: {}", job_name, error);
    Ok(())
}

/// Current status row for a job, if it ever ran
pub async fn get_status(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find_by_id(job_name.to_string()).one(db).await
}
