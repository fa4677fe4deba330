use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Initializes a connection pool to the shared Postgres database gl-rs,
/// ar-rs, ap-rs, and party-rs migrate their tables into. Reporting owns no
/// schema of its own — it is a pure-read consumer of those modules' tables
/// and their C11 projection tables, so it never runs `sqlx::migrate!`.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let max_connections = std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);

    let min_connections = std::env::var("DB_MIN_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);

    let acquire_timeout_secs = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(database_url)
        .await
}
