//! Daily cycle: sentiment index and the last completed day's close, once a
//! day at a fixed local time.

use chrono::{Local, NaiveDateTime, NaiveTime};
use std::time::Duration;

use crate::services::refresh::RefreshCoordinator;

pub async fn start_daily_sync_job(coordinator: RefreshCoordinator) {
    tokio::spawn(async move {
        let at = coordinator.config().daily_sync_time;

        loop {
            let wait = duration_until_next(at, Local::now().naive_local());
            tracing::info!(
                "Next daily sync at {} local, in {}s",
                at.format("%H:%M"),
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;

            tracing::info!("Starting scheduled daily sync");
            if let Err(e) = coordinator.run_daily_cycle().await {
                tracing::error!("Daily sync failed: {}", e);
            }
        }
    });
}

/// Time from `now` until the next occurrence of `at`. An `at` equal to `now`
/// counts as tomorrow so a finished run never fires twice.
pub fn duration_until_next(at: NaiveTime, now: NaiveDateTime) -> Duration {
    let today = now.date().and_time(at);
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn now(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_time(at(h, m))
    }

    #[test]
    fn test_later_today() {
        assert_eq!(
            duration_until_next(at(0, 15), now(0, 5)),
            Duration::from_secs(10 * 60)
        );
    }

    #[test]
    fn test_rolls_over_to_tomorrow() {
        assert_eq!(
            duration_until_next(at(0, 15), now(23, 45)),
            Duration::from_secs(30 * 60)
        );
        assert_eq!(
            duration_until_next(at(0, 15), now(0, 15)),
            Duration::from_secs(24 * 3600)
        );
    }
}
