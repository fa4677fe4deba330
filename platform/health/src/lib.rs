//! Shared liveness/readiness endpoint, identical across every service binary.
//!
//! Grounded on `gl-rs`'s trivial `health()` handler, generalised with an
//! optional DB-ping readiness check so `/health` can distinguish "process is
//! up" from "process can actually serve requests".

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub checked_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ReadinessCheck: Send + Sync {
    async fn ready(&self) -> bool;
}

pub struct HealthState {
    pub service: &'static str,
    pub version: &'static str,
    pub readiness: Option<Arc<dyn ReadinessCheck>>,
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok",
        service: state.service,
        version: state.version,
        checked_at: Utc::now(),
    })
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let ready = match &state.readiness {
        Some(check) => check.ready().await,
        None => true,
    };
    let status = if ready { "ok" } else { "not_ready" };
    (
        if ready {
            axum::http::StatusCode::OK
        } else {
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        },
        Json(HealthStatus {
            status,
            service: state.service,
            version: state.version,
            checked_at: Utc::now(),
        }),
    )
}

/// Builds the `/health` and `/ready` routes every service binary nests under
/// its router, matching the path `gl-rs`'s `main.rs` wires at `/api/health`.
pub fn health_routes(service: &'static str, version: &'static str) -> Router {
    health_routes_with_readiness(service, version, None)
}

pub fn health_routes_with_readiness(
    service: &'static str,
    version: &'static str,
    readiness: Option<Arc<dyn ReadinessCheck>>,
) -> Router {
    let state = Arc::new(HealthState {
        service,
        version,
        readiness,
    });
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_returns_ok() {
        let app = health_routes("test-svc", "1.0.0");
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
