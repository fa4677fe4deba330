use axum::{routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use integrations_rs::{
    config::Config,
    db,
    health::health,
    routes::pos::{self, IntegrationState},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting integrations service...");

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

    let state = Arc::new(IntegrationState {
        pool: Arc::new(pool),
        integration_keys: config.integration_keys,
    });

    let app = Router::new()
        .route("/api/health", axum::routing::get(health))
        .route(
            "/integrations/piti/companies/{tenant_id}/sales",
            post(pos::import_sale),
        )
        .route(
            "/integrations/piti/companies/{tenant_id}/refunds",
            post(pos::import_refund),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("integrations service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed to start");
}
