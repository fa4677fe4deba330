//! HTTP route for C8 direct stock adjustments, wrapped by C5's idempotency
//! gate like every other write per spec §6.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use idempotency::{run_idempotent, IdempotencyError, IdempotencyOutcome};
use platform_http_contracts::ApiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::stock_move_repo::Direction;
use crate::services::adjustment_service::{self, AdjustStockInput};

fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty() && k.len() <= 128)
        .map(|k| k.to_string())
        .ok_or_else(|| ApiError::validation("Idempotency-Key header is required"))
}

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

async fn closed_through(pool: &PgPool, tenant_id: Uuid) -> Option<NaiveDate> {
    tenant_registry::closed_through_date(pool, tenant_id)
        .await
        .ok()
        .flatten()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AdjustStockBody {
    pub item_id: Uuid,
    pub location_id: Option<Uuid>,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub adjustment_date: NaiveDate,
    pub currency: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustStockResponse {
    pub stock_move_id: Uuid,
    pub journal_entry_id: Uuid,
}

pub async fn adjust_stock(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AdjustStockBody>,
) -> Result<Json<AdjustStockResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /inventory/adjustments", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let pool_ref = pool.clone();
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let adjusted = adjustment_service::adjust_stock(
            tx,
            &pool_ref,
            AdjustStockInput {
                tenant_id,
                item_id: body.item_id,
                location_id: body.location_id,
                direction: body.direction,
                quantity: body.quantity,
                unit_cost: body.unit_cost,
                adjustment_date: body.adjustment_date,
                currency: body.currency,
                reason: body.reason,
            },
            closed,
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(AdjustStockResponse {
            stock_move_id: adjusted.stock_move_id,
            journal_entry_id: adjusted.journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}
