use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use ar_rs::{
    config::Config,
    db,
    health::health,
    routes::{credit_notes, customer_advances, invoices, payments, public},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting ar service...");

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
            "/tenants/{tenant_id}/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/tenants/{tenant_id}/invoices/{id}", get(invoices::get_invoice))
        .route("/tenants/{tenant_id}/invoices/{id}/post", post(invoices::post_invoice))
        .route("/tenants/{tenant_id}/invoices/{id}/void", post(invoices::void_invoice))
        .route(
            "/tenants/{tenant_id}/invoices/{id}/public-link",
            post(invoices::mint_public_link),
        )
        .route(
            "/tenants/{tenant_id}/invoices/{id}/payments",
            get(payments::list_payments_for_invoice),
        )
        .route("/tenants/{tenant_id}/payments", post(payments::record_payment))
        .route(
            "/tenants/{tenant_id}/payments/{id}/void",
            post(payments::void_payment),
        )
        .route(
            "/tenants/{tenant_id}/credit-notes",
            post(credit_notes::issue_credit_note),
        )
        .route(
            "/tenants/{tenant_id}/credit-notes/{id}",
            get(credit_notes::get_credit_note),
        )
        .route(
            "/tenants/{tenant_id}/credit-notes/{id}/apply",
            post(credit_notes::apply_credit_note),
        )
        .route(
            "/tenants/{tenant_id}/customer-advances",
            post(customer_advances::receive_customer_advance),
        )
        .route(
            "/tenants/{tenant_id}/customer-advances/{id}",
            get(customer_advances::get_customer_advance),
        )
        .route(
            "/tenants/{tenant_id}/customer-advances/{id}/apply",
            post(customer_advances::apply_customer_advance),
        )
        .route("/public/invoices/{token}", get(public::get_public_invoice))
        .with_state(shared_pool)
        .layer(axum::Extension(Arc::new(config.public_link_secret.clone())))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("ar service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
