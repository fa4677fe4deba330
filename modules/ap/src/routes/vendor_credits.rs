//! HTTP routes for vendor credit issuance and application, each wrapped by
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
use crate::repos::vendor_credit_repo::{VendorCredit, VendorCreditError};
use crate::services::vendor_credit_service::{self, VendorCreditServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn vendor_credit_err(err: VendorCreditServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        VendorCreditServiceError::InvalidAmount | VendorCreditServiceError::InvalidApplicationAmount => {
            ApiError::validation(err.to_string())
        }
        VendorCreditServiceError::InsufficientCredit { .. } => ApiError::new(State, err.to_string()),
        VendorCreditServiceError::BillNotPayable { .. } => ApiError::new(State, err.to_string()),
        VendorCreditServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        VendorCreditServiceError::VendorCredit(VendorCreditError::NotFound { .. }) => {
            ApiError::not_found(err.to_string())
        }
        VendorCreditServiceError::VendorCredit(_) => ApiError::database_error(),
        VendorCreditServiceError::Bill(BillError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        VendorCreditServiceError::Bill(_) => ApiError::database_error(),
        VendorCreditServiceError::Payment(_) => ApiError::database_error(),
        VendorCreditServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        VendorCreditServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        VendorCreditServiceError::Posting(_) => ApiError::database_error(),
        VendorCreditServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct IssueVendorCreditBody {
    pub vendor_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub expense_account_code: String,
    #[serde(default)]
    pub tax_amount: Decimal,
}

pub async fn issue_vendor_credit(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<IssueVendorCreditBody>,
) -> Result<Json<VendorCredit>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /vendor-credits", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let vendor_credit = vendor_credit_service::issue_vendor_credit(
            tx,
            vendor_credit_service::IssueVendorCreditInput {
                tenant_id,
                vendor_id: body.vendor_id,
                credit_date: body.credit_date,
                currency: body.currency,
                amount: body.amount,
                expense_account_code: body.expense_account_code,
                tax_amount: body.tax_amount,
                closed_through_date: closed,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(vendor_credit)
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApplyVendorCreditBody {
    pub bill_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedVendorCreditResponse {
    pub vendor_credit_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
}

pub async fn apply_vendor_credit(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, vendor_credit_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<ApplyVendorCreditBody>,
) -> Result<Json<AppliedVendorCreditResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /vendor-credits/apply", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        vendor_credit_service::apply_vendor_credit(tx, tenant_id, vendor_credit_id, body.bill_id, body.amount)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(AppliedVendorCreditResponse {
            vendor_credit_id,
            bill_id: body.bill_id,
            amount: body.amount,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn get_vendor_credit(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<VendorCredit>, ApiError> {
    let vendor_credit = crate::repos::vendor_credit_repo::find_by_id(pool.as_ref(), tenant_id, id)
        .await
        .map_err(|e| vendor_credit_err(VendorCreditServiceError::VendorCredit(e)))?;
    Ok(Json(vendor_credit))
}
