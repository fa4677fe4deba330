use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use party_rs::{
    config::Config,
    db,
    health::health,
    routes::{customers, vendors},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting party service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let shared_pool = Arc::new(pool);
    let app = Router::new()
        .route("/api/health", get(health))
        .route(
            "/tenants/{tenant_id}/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/tenants/{tenant_id}/customers/{id}", get(customers::get_customer))
        .route(
            "/tenants/{tenant_id}/vendors",
            get(vendors::list_vendors).post(vendors::create_vendor),
        )
        .route("/tenants/{tenant_id}/vendors/{id}", get(vendors::get_vendor))
        .with_state(shared_pool)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("party service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
