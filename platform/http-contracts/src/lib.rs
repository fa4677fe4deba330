//! Shared HTTP response envelope and the ledger core's error taxonomy.
//!
//! Grounded on `modules/gl/src/routes/period_close.rs`'s `ErrorResponse` /
//! `PeriodCloseHttpError` pair, generalised from one route's error enum to
//! the nine-kind taxonomy every module's write path raises against.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(feature = "axum")]
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// The taxonomy kinds from the ledger core's error handling design. Kinds,
/// not exception types: every module maps its local error enum onto one of
/// these before it reaches the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Tenant,
    State,
    Imbalance,
    PeriodClosed,
    IdempotencyConflict,
    Integrity,
    Resource,
    NotFound,
}

impl ErrorKind {
    /// Status mapping per the propagation policy: most kinds surface with a
    /// specific status and the transaction rolls back. INTEGRITY fails closed
    /// as a 5xx. RESOURCE at the edge of a write is a 503.
    #[cfg(feature = "axum")]
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Tenant => StatusCode::FORBIDDEN,
            ErrorKind::State => StatusCode::CONFLICT,
            ErrorKind::Imbalance => StatusCode::BAD_REQUEST,
            ErrorKind::PeriodClosed => StatusCode::CONFLICT,
            ErrorKind::IdempotencyConflict => StatusCode::CONFLICT,
            ErrorKind::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Resource => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

/// An API error ready to be returned from a handler. `message` must never
/// leak internal identifiers or another tenant's data — callers should pass
/// a generic message for anything derived from a database error.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn tenant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Tenant, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Use for any database-derived failure that isn't itself one of the
    /// named kinds — keeps the message generic per the no-internal-leak rule.
    pub fn database_error() -> Self {
        Self::new(ErrorKind::Resource, "a downstream resource is unavailable")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(feature = "axum")]
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = ErrorResponse {
            kind: self.kind,
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}
