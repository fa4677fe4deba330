//! HTTP routes for vendor advance payment and application, each wrapped by
//! C5's idempotency gate per spec §6.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use idempotency::{run_idempotent, IdempotencyError};
use platform_http_contracts::ApiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::bill_repo::BillError;
use crate::repos::vendor_advance_repo::{VendorAdvance, VendorAdvanceError};
use crate::services::vendor_advance_service::{self, VendorAdvanceServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn vendor_advance_err(err: VendorAdvanceServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        VendorAdvanceServiceError::InvalidAmount | VendorAdvanceServiceError::InvalidApplicationAmount => {
            ApiError::validation(err.to_string())
        }
        VendorAdvanceServiceError::InsufficientAdvance { .. } => ApiError::new(State, err.to_string()),
        VendorAdvanceServiceError::BillNotPayable { .. } => ApiError::new(State, err.to_string()),
        VendorAdvanceServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        VendorAdvanceServiceError::Advance(VendorAdvanceError::NotFound { .. }) => {
            ApiError::not_found(err.to_string())
        }
        VendorAdvanceServiceError::Advance(_) => ApiError::database_error(),
        VendorAdvanceServiceError::Bill(BillError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        VendorAdvanceServiceError::Bill(_) => ApiError::database_error(),
        VendorAdvanceServiceError::Payment(_) => ApiError::database_error(),
        VendorAdvanceServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        VendorAdvanceServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        VendorAdvanceServiceError::Posting(_) => ApiError::database_error(),
        VendorAdvanceServiceError::Outbox(_) => ApiError::database_error(),
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty() && k.len() <= 128)
        .map(|k| k.to_string())
        .ok_or_else(|| ApiError::validation("Idempotency-Key header is required"))
}

async fn closed_through(pool: &PgPool, tenant_id: Uuid) -> Option<NaiveDate> {
    tenant_registry::closed_through_date(pool, tenant_id)
        .await
        .ok()
        .flatten()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PayVendorAdvanceBody {
    pub vendor_id: Uuid,
    pub paid_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub bank_account_code: String,
}

pub async fn pay_vendor_advance(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<PayVendorAdvanceBody>,
) -> Result<Json<VendorAdvance>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /vendor-advances", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let advance = vendor_advance_service::pay_vendor_advance(
            tx,
            vendor_advance_service::PayVendorAdvanceInput {
                tenant_id,
                vendor_id: body.vendor_id,
                paid_date: body.paid_date,
                currency: body.currency,
                amount: body.amount,
                bank_account_code: body.bank_account_code,
                closed_through_date: closed,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(advance)
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApplyVendorAdvanceBody {
    pub bill_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedVendorAdvanceResponse {
    pub advance_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
}

pub async fn apply_vendor_advance(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, advance_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<ApplyVendorAdvanceBody>,
) -> Result<Json<AppliedVendorAdvanceResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /vendor-advances/apply", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        vendor_advance_service::apply_vendor_advance(tx, tenant_id, advance_id, body.bill_id, body.amount)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(AppliedVendorAdvanceResponse {
            advance_id,
            bill_id: body.bill_id,
            amount: body.amount,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn get_vendor_advance(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<VendorAdvance>, ApiError> {
    let advance = crate::repos::vendor_advance_repo::find_by_id(pool.as_ref(), tenant_id, id)
        .await
        .map_err(|e| vendor_advance_err(VendorAdvanceServiceError::Advance(e)))?;
    Ok(Json(advance))
}
