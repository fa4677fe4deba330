//! HTTP routes for customer advance receipt and application, each wrapped by
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

use crate::repos::customer_advance_repo::{CustomerAdvance, CustomerAdvanceError};
use crate::repos::invoice_repo::InvoiceError;
use crate::services::customer_advance_service::{self, CustomerAdvanceServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn customer_advance_err(err: CustomerAdvanceServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        CustomerAdvanceServiceError::InvalidAmount | CustomerAdvanceServiceError::InvalidApplicationAmount => {
            ApiError::validation(err.to_string())
        }
        CustomerAdvanceServiceError::InsufficientAdvance { .. } => ApiError::new(State, err.to_string()),
        CustomerAdvanceServiceError::InvoiceNotPayable { .. } => ApiError::new(State, err.to_string()),
        CustomerAdvanceServiceError::Overpayment { .. } => ApiError::new(State, err.to_string()),
        CustomerAdvanceServiceError::Advance(CustomerAdvanceError::NotFound { .. }) => {
            ApiError::not_found(err.to_string())
        }
        CustomerAdvanceServiceError::Advance(_) => ApiError::database_error(),
        CustomerAdvanceServiceError::Invoice(InvoiceError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        CustomerAdvanceServiceError::Invoice(_) => ApiError::database_error(),
        CustomerAdvanceServiceError::Payment(_) => ApiError::database_error(),
        CustomerAdvanceServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        CustomerAdvanceServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        CustomerAdvanceServiceError::Posting(_) => ApiError::database_error(),
        CustomerAdvanceServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct ReceiveCustomerAdvanceBody {
    pub customer_id: Uuid,
    pub received_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub bank_account_code: String,
}

pub async fn receive_customer_advance(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ReceiveCustomerAdvanceBody>,
) -> Result<Json<CustomerAdvance>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /customer-advances", &canonical);
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let advance = customer_advance_service::receive_customer_advance(
            tx,
            customer_advance_service::ReceiveCustomerAdvanceInput {
                tenant_id,
                customer_id: body.customer_id,
                received_date: body.received_date,
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
pub struct ApplyCustomerAdvanceBody {
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedCustomerAdvanceResponse {
    pub advance_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

pub async fn apply_customer_advance(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, advance_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<ApplyCustomerAdvanceBody>,
) -> Result<Json<AppliedCustomerAdvanceResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /customer-advances/apply", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        customer_advance_service::apply_customer_advance(
            tx,
            tenant_id,
            advance_id,
            body.invoice_id,
            body.amount,
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(AppliedCustomerAdvanceResponse {
            advance_id,
            invoice_id: body.invoice_id,
            amount: body.amount,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn get_customer_advance(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CustomerAdvance>, ApiError> {
    let advance = crate::repos::customer_advance_repo::find_by_id(pool.as_ref(), tenant_id, id)
        .await
        .map_err(|e| customer_advance_err(CustomerAdvanceServiceError::Advance(e)))?;
    Ok(Json(advance))
}
