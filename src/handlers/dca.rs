use axum::{Json, extract::State};

use crate::AppState;
use crate::handlers::{ApiError, bad_request, internal_error};
use crate::models::dca::{BestDayRequest, BestDayResponse, DcaResultResponse, DcaSimulationRequest};
use crate::services::dca::{self, DcaParameters, Frequency, PricePoint};
use crate::services::dca_optimizer::optimize_purchase_day;

pub async fn simulate_dca(
    State(state): State<AppState>,
    Json(request): Json<DcaSimulationRequest>,
) -> Result<Json<DcaResultResponse>, ApiError> {
    let parameters = request.to_parameters().map_err(bad_request)?;
    let series = load_series(&state, request.days).await?;

    let result = dca::simulate(&parameters, &series).map_err(bad_request)?;

    tracing::debug!(
        "DCA {:?} over {} points: {} purchases, {}%",
        parameters.frequency,
        series.len(),
        result.purchase_count,
        result.gain_loss_percent.round_dp(2)
    );

    Ok(Json(DcaResultResponse::from(&result)))
}

pub async fn find_best_day(
    State(state): State<AppState>,
    Json(request): Json<BestDayRequest>,
) -> Result<Json<BestDayResponse>, ApiError> {
    DcaParameters {
        amount: request.amount(),
        currency: request.currency,
        frequency: Frequency::Daily,
    }
    .validate()
    .map_err(bad_request)?;

    let series = load_series(&state, request.days).await?;

    let optimization = optimize_purchase_day(request.amount(), request.currency, &series)
        .map_err(bad_request)?;

    Ok(Json(BestDayResponse::from(&optimization)))
}

async fn load_series(state: &AppState, days: Option<u32>) -> Result<Vec<PricePoint>, ApiError> {
    let days = days.unwrap_or(state.history_window_days);

    let closes = state
        .coordinator
        .historical_series(days)
        .await
        .map_err(|e| internal_error("Failed to read historical prices", e))?;

    Ok(closes.into_iter().map(PricePoint::from).collect())
}
