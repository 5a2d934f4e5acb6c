pub mod daily_sync;
pub mod high_frequency_sync;

use crate::services::refresh::RefreshCoordinator;

/// Spawn the startup load and both periodic cadences.
///
/// The startup load runs the first high-frequency cycle, daily cycle and
/// backfill and then releases the readiness barrier. The periodic loops
/// start their first run one period later.
pub async fn start_refresh_jobs(coordinator: RefreshCoordinator) {
    let initial = coordinator.clone();
    tokio::spawn(async move {
        initial.initial_load().await;
    });

    high_frequency_sync::start_high_frequency_sync_job(coordinator.clone()).await;
    daily_sync::start_daily_sync_job(coordinator).await;
}
