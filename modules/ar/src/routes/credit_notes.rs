//! HTTP routes for C6 credit note issuance and application, each wrapped by
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

use crate::repos::credit_note_repo::{CreditNote, CreditNoteError};
use crate::repos::invoice_repo::InvoiceError;
use crate::services::credit_note_service::{self, CreditNoteServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn credit_note_err(err: CreditNoteServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        CreditNoteServiceError::InvalidAmount | CreditNoteServiceError::InvalidApplicationAmount => {
            ApiError::validation(err.to_string())
        }
        CreditNoteServiceError::InsufficientCredit { .. } => ApiError::new(State, err.to_string()),
        CreditNoteServiceError::InvoiceNotPayable { .. } => ApiError::new(State, err.to_string()),
        CreditNoteServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        CreditNoteServiceError::CreditNote(CreditNoteError::NotFound { .. }) => {
            ApiError::not_found(err.to_string())
        }
        CreditNoteServiceError::CreditNote(_) => ApiError::database_error(),
        CreditNoteServiceError::Invoice(InvoiceError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        CreditNoteServiceError::Invoice(_) => ApiError::database_error(),
        CreditNoteServiceError::Payment(_) => ApiError::database_error(),
        CreditNoteServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        CreditNoteServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        CreditNoteServiceError::Posting(_) => ApiError::database_error(),
        CreditNoteServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct IssueCreditNoteBody {
    pub customer_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub income_account_code: String,
    #[serde(default)]
    pub tax_amount: Decimal,
}

pub async fn issue_credit_note(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<IssueCreditNoteBody>,
) -> Result<Json<CreditNote>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /credit-notes", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let credit_note = credit_note_service::issue_credit_note(
            tx,
            credit_note_service::IssueCreditNoteInput {
                tenant_id,
                customer_id: body.customer_id,
                credit_date: body.credit_date,
                currency: body.currency,
                amount: body.amount,
                income_account_code: body.income_account_code,
                tax_amount: body.tax_amount,
                closed_through_date: closed,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(credit_note)
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApplyCreditNoteBody {
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedCreditNoteResponse {
    pub credit_note_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

pub async fn apply_credit_note(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, credit_note_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<ApplyCreditNoteBody>,
) -> Result<Json<AppliedCreditNoteResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /credit-notes/apply", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        credit_note_service::apply_credit_note(tx, tenant_id, credit_note_id, body.invoice_id, body.amount)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(AppliedCreditNoteResponse {
            credit_note_id,
            invoice_id: body.invoice_id,
            amount: body.amount,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn get_credit_note(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CreditNote>, ApiError> {
    let credit_note = crate::repos::credit_note_repo::find_by_id(pool.as_ref(), tenant_id, id)
        .await
        .map_err(|e| credit_note_err(CreditNoteServiceError::CreditNote(e)))?;
    Ok(Json(credit_note))
}
