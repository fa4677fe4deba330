use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use reporting_rs::{config::Config, db, health::health, routes::reports};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting reporting service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let shared_pool = Arc::new(pool);
    let app = Router::new()
        .route("/api/health", get(health))
        .route(
            "/tenants/{tenant_id}/reports/profit-and-loss",
            get(reports::profit_and_loss),
        )
        .route(
            "/tenants/{tenant_id}/reports/balance-sheet",
            get(reports::balance_sheet),
        )
        .route("/tenants/{tenant_id}/reports/ar-aging", get(reports::ar_aging))
        .route("/tenants/{tenant_id}/reports/ap-aging", get(reports::ap_aging))
        .route(
            "/tenants/{tenant_id}/reports/accounts/{account_code}/activity",
            get(reports::account_activity),
        )
        .with_state(shared_pool)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("reporting service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
