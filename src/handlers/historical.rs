use axum::{
    Json,
    extract::{Query, State},
};

use crate::AppState;
use crate::handlers::{ApiError, internal_error};
use crate::models::historical::{HistoricalPriceEntry, HistoricalPricesQuery};

pub async fn get_historical_prices(
    State(state): State<AppState>,
    Query(query): Query<HistoricalPricesQuery>,
) -> Result<Json<Vec<HistoricalPriceEntry>>, ApiError> {
    let days = query.days.unwrap_or(state.history_window_days);

    let closes = state
        .coordinator
        .historical_series(days)
        .await
        .map_err(|e| internal_error("Failed to read historical prices", e))?;

    tracing::debug!("Serving {} daily closes (last {} days)", closes.len(), days);

    Ok(Json(closes.into_iter().map(HistoricalPriceEntry::from).collect()))
}
