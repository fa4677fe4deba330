use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use inventory_rs::{config::Config, health::health, routes::{adjustments, items}};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    platform_sdk::init_tracing();

    tracing::info!("Starting inventory service...");

    let config = Config::from_env().expect("failed to load configuration from environment");

    let pool = platform_sdk::init_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let shared_pool = Arc::new(pool);
    let app = Router::new()
        .route("/api/health", get(health))
        .route(
            "/companies/{tenant_id}/items",
            get(items::list_items).post(items::create_item),
        )
        .route("/companies/{tenant_id}/items/{id}", get(items::get_item))
        .route(
            "/companies/{tenant_id}/stock-balance",
            get(items::get_stock_balance),
        )
        .route(
            "/companies/{tenant_id}/inventory/adjustments",
            post(adjustments::adjust_stock),
        )
        .with_state(shared_pool)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Inventory service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(platform_sdk::shutdown_signal())
        .await
        .expect("server failed to start");
}
