//! Shared service bootstrap: tracing init, pool init, bus construction, and
//! graceful shutdown signal plumbing.
//!
//! Every module's `main.rs` (see `gl-rs`) repeats the same handful of steps
//! before it starts serving: load `.env`, init a tracing subscriber, build a
//! Postgres pool, pick an event bus implementation from config, and wire a
//! shutdown signal into `axum::serve`. This crate is that boilerplate,
//! factored out once.

use event_bus::{EventBus, InMemoryBus, NatsBus};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("database pool initialization failed: {0}")]
    Pool(#[from] sqlx::Error),
    #[error("event bus connection failed: {0}")]
    Bus(String),
}

/// Initializes a `tracing_subscriber` with an `EnvFilter` (default `info`),
/// matching `gl-rs`'s `main.rs`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).json().try_init();
}

/// Builds a Postgres pool the same way `gl-rs`'s `db::init_pool` does,
/// reading `DB_MAX_CONNECTIONS` (default 10), `DB_MIN_CONNECTIONS` (default
/// 0), and `DB_ACQUIRE_TIMEOUT_SECS` (default 3) from the environment so test
/// suites running many services in parallel don't exhaust the database's
/// connection limit.
pub async fn init_pool(database_url: &str) -> Result<PgPool, BootstrapError> {
    let max_connections = config_validator::env_or("DB_MAX_CONNECTIONS", 10u32);
    let min_connections = config_validator::env_or("DB_MIN_CONNECTIONS", 0u32);
    let acquire_timeout_secs = config_validator::env_or("DB_ACQUIRE_TIMEOUT_SECS", 3u64);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(database_url)
        .await?;
    Ok(pool)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusType {
    InMemory,
    Nats,
}

impl BusType {
    pub fn from_str_or_inmemory(value: &str) -> Self {
        match value {
            "nats" => BusType::Nats,
            _ => BusType::InMemory,
        }
    }
}

/// Constructs the configured [`EventBus`] implementation, matching `gl-rs`'s
/// `main.rs` match on `config.bus_type`.
pub async fn build_event_bus(
    bus_type: BusType,
    nats_url: &str,
) -> Result<Arc<dyn EventBus>, BootstrapError> {
    match bus_type {
        BusType::InMemory => Ok(Arc::new(InMemoryBus::new())),
        BusType::Nats => {
            let client = async_nats::connect(nats_url)
                .await
                .map_err(|e| BootstrapError::Bus(e.to_string()))?;
            Ok(Arc::new(NatsBus::new(client)))
        }
    }
}

/// Resolves a future that completes on SIGINT/SIGTERM, for use as
/// `axum::serve(...).with_graceful_shutdown(shutdown_signal())`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
