//! HTTP routes for C6 payment recording and reversal, each wrapped by C5's
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

use crate::repos::invoice_repo::{Invoice, InvoiceError};
use crate::repos::payment_repo::{Payment, PaymentError};
use crate::services::payment_service::{self, PaymentServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn payment_err(err: PaymentServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        PaymentServiceError::InvalidAmount => ApiError::validation(err.to_string()),
        PaymentServiceError::InvoiceNotPayable { .. } => ApiError::new(State, err.to_string()),
        PaymentServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        PaymentServiceError::Invoice(InvoiceError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        PaymentServiceError::Invoice(_) => ApiError::database_error(),
        PaymentServiceError::Payment(PaymentError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        PaymentServiceError::Payment(PaymentError::AlreadyReversed { .. }) => {
            ApiError::new(State, err.to_string())
        }
        PaymentServiceError::Payment(_) => ApiError::database_error(),
        PaymentServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        PaymentServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        PaymentServiceError::Posting(_) => ApiError::database_error(),
        PaymentServiceError::Outbox(_) => ApiError::database_error(),
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
    pub invoice_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub invoice: Invoice,
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
        let recorded = payment_service::record_payment(
            tx,
            tenant_id,
            body.invoice_id,
            body.payment_date,
            body.amount,
            body.bank_account_code,
            closed,
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(PaymentResponse {
            payment: recorded.payment,
            invoice: recorded.invoice,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoidedPaymentResponse {
    pub payment: Payment,
    pub invoice: Invoice,
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
        let reversed = payment_service::void_payment(tx, tenant_id, payment_id, closed)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(VoidedPaymentResponse {
            payment: reversed.payment,
            invoice: reversed.invoice,
            reversal_journal_entry_id: reversed.reversal_journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn list_payments_for_invoice(
    State(pool): State<Arc<PgPool>>,
    Path((_tenant_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = crate::repos::payment_repo::list_for_invoice(pool.as_ref(), invoice_id)
        .await
        .map_err(|_| ApiError::database_error())?;
    Ok(Json(payments))
}
