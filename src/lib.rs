// src/lib.rs

use axum::{
    Router,
    routing::{get, post},
};
use services::refresh::RefreshCoordinator;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: RefreshCoordinator,
    /// Default lookback for historical reads and DCA runs
    pub history_window_days: u32,
}

pub mod entities {
    pub mod prelude;
    pub mod current_prices;
    pub mod daily_close_prices;
    pub mod fear_greed_history;
    pub mod global_metrics_history;
    pub mod mempool_snapshot;
    pub mod sync_status;
}

pub mod services {
    pub mod coingecko;
    pub mod mempool;
    pub mod fear_greed;
    pub mod market_data;
    pub mod supply;
    pub mod metrics;
    pub mod store;
    pub mod sync_status;
    pub mod refresh;
    pub mod poll_scheduler;
    pub mod dca;
    pub mod dca_optimizer;
}

pub mod config;
pub mod handlers;
pub mod jobs;
pub mod models;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/data", get(handlers::dashboard::get_dashboard_data))
        .route(
            "/api/historical-prices",
            get(handlers::historical::get_historical_prices),
        )
        .route("/api/dca/simulate", post(handlers::dca::simulate_dca))
        .route("/api/dca/best-day", post(handlers::dca::find_best_day))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
