pub mod dashboard;
pub mod dca;
pub mod health;
pub mod historical;

use axum::{Json, http::StatusCode};

use crate::models::error::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn internal_error(context: &str, error: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("{}: {}", context, error))),
    )
}

pub(crate) fn bad_request(error: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error.to_string())))
}
