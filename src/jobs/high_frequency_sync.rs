use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::services::refresh::RefreshCoordinator;

pub async fn start_high_frequency_sync_job(coordinator: RefreshCoordinator) {
    tokio::spawn(async move {
        let period = coordinator.config().update_interval;

        // The startup load already ran the first cycle
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("High-frequency sync scheduled every {}s", period.as_secs());

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled high-frequency sync");

            if let Err(e) = coordinator.run_high_frequency_cycle().await {
                tracing::error!(
                    "High-frequency sync failed, keeping previous snapshot: {}",
                    e
                );
            }
        }
    });
}
