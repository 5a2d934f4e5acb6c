use bitpanel_backend::{
    AppState, build_router,
    config::AppConfig,
    jobs::start_refresh_jobs,
    services::{
        coingecko::CoinGeckoService,
        fear_greed::FearGreedService,
        market_data::HttpMarketDataSource,
        mempool::MempoolService,
        refresh::RefreshCoordinator,
        store::SnapshotStore,
    },
};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bitpanel_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Connect to database
    tracing::info!("Connecting to database...");
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(8)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    if config.coingecko_api_key.is_none() {
        tracing::warn!("COINGECKO_API_KEY not set - CoinGecko requests go out without a key");
    }

    let timeout = config.refresh.fetch_timeout;
    let source = HttpMarketDataSource::new(
        CoinGeckoService::new(
            config.coingecko_api_key.clone(),
            config.coingecko_api_key_header.clone(),
            config.coingecko_base_url.clone(),
            timeout,
        ),
        MempoolService::new(config.mempool_base_url.clone(), timeout),
        FearGreedService::new(config.fear_greed_url.clone(), timeout),
    );

    let coordinator = RefreshCoordinator::new(
        SnapshotStore::new(db),
        Arc::new(source),
        config.refresh.clone(),
    );

    // Initial load plus both cadences
    start_refresh_jobs(coordinator.clone()).await;

    let state = AppState {
        coordinator,
        history_window_days: config.history_window_days,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!(
        "Server listening on {}",
        listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| config.bind_addr.clone())
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, stopping server");
}
