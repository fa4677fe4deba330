//! HTTP routes for C7 payment recording and reversal, each wrapped by C5's
//! idempotency gate per spec §6.

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

use crate::repos::ap_payment_repo::{ApPayment, ApPaymentError};
use crate::repos::bill_repo::{Bill, BillError};
use crate::services::ap_payment_service::{self, ApPaymentServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn payment_err(err: ApPaymentServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        ApPaymentServiceError::InvalidAmount => ApiError::validation(err.to_string()),
        ApPaymentServiceError::BillNotPayable { .. } => ApiError::new(State, err.to_string()),
        ApPaymentServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        ApPaymentServiceError::Bill(BillError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        ApPaymentServiceError::Bill(_) => ApiError::database_error(),
        ApPaymentServiceError::Payment(ApPaymentError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        ApPaymentServiceError::Payment(ApPaymentError::AlreadyReversed { .. }) => {
            ApiError::new(State, err.to_string())
        }
        ApPaymentServiceError::Payment(_) => ApiError::database_error(),
        ApPaymentServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        ApPaymentServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        ApPaymentServiceError::Posting(_) => ApiError::database_error(),
        ApPaymentServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct RecordPaymentBody {
    pub bill_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment: ApPayment,
    pub bill: Bill,
}

pub async fn record_payment(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RecordPaymentBody>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /payments", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let recorded = ap_payment_service::record_payment(
            tx,
            tenant_id,
            body.bill_id,
            body.payment_date,
            body.amount,
            body.bank_account_code,
            closed,
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(PaymentResponse {
            payment: recorded.payment,
            bill: recorded.bill,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoidedPaymentResponse {
    pub payment: ApPayment,
    pub bill: Bill,
    pub reversal_journal_entry_id: Uuid,
}

pub async fn void_payment(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, payment_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<VoidedPaymentResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let fp = idempotency::fingerprint(tenant_id, "POST /payments/void", payment_id.as_bytes());
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let reversed = ap_payment_service::void_payment(tx, tenant_id, payment_id, closed)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(VoidedPaymentResponse {
            payment: reversed.payment,
            bill: reversed.bill,
            reversal_journal_entry_id: reversed.reversal_journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn list_payments_for_bill(
    State(pool): State<Arc<PgPool>>,
    Path((_tenant_id, bill_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<ApPayment>>, ApiError> {
    let payments = crate::repos::ap_payment_repo::list_for_bill(pool.as_ref(), bill_id)
        .await
        .map_err(|_| ApiError::database_error())?;
    Ok(Json(payments))
}
