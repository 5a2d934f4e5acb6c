use axum::{Json, extract::State};
use chrono::Utc;

use crate::AppState;
use crate::handlers::{ApiError, internal_error};
use crate::models::dashboard::DashboardResponse;

/// Current snapshot. Before the first cycle ever committed, this waits for
/// the initial load to finish.
pub async fn get_dashboard_data(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let snapshot = state
        .coordinator
        .get_snapshot()
        .await
        .map_err(|e| internal_error("Failed to read snapshot", e))?;

    Ok(Json(DashboardResponse::from_snapshot(
        snapshot,
        state.coordinator.config().update_interval,
        Utc::now(),
    )))
}
