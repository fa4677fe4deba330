use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use ap_rs::{
    config::Config,
    db,
    health::health,
    routes::{bills, payments, vendor_advances, vendor_credits},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting ap service...");

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
            "/tenants/{tenant_id}/bills",
            get(bills::list_bills).post(bills::create_bill),
        )
        .route("/tenants/{tenant_id}/bills/{id}", get(bills::get_bill))
        .route("/tenants/{tenant_id}/bills/{id}/post", post(bills::post_bill))
        .route("/tenants/{tenant_id}/bills/{id}/void", post(bills::void_bill))
        .route(
            "/tenants/{tenant_id}/bills/{id}/payments",
            get(payments::list_payments_for_bill),
        )
        .route("/tenants/{tenant_id}/payments", post(payments::record_payment))
        .route(
            "/tenants/{tenant_id}/payments/{id}/void",
            post(payments::void_payment),
        )
        .route(
            "/tenants/{tenant_id}/vendor-credits",
            post(vendor_credits::issue_vendor_credit),
        )
        .route(
            "/tenants/{tenant_id}/vendor-credits/{id}",
            get(vendor_credits::get_vendor_credit),
        )
        .route(
            "/tenants/{tenant_id}/vendor-credits/{id}/apply",
            post(vendor_credits::apply_vendor_credit),
        )
        .route(
            "/tenants/{tenant_id}/vendor-advances",
            post(vendor_advances::pay_vendor_advance),
        )
        .route(
            "/tenants/{tenant_id}/vendor-advances/{id}",
            get(vendor_advances::get_vendor_advance),
        )
        .route(
            "/tenants/{tenant_id}/vendor-advances/{id}/apply",
            post(vendor_advances::apply_vendor_advance),
        )
        .with_state(shared_pool)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("ap service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
