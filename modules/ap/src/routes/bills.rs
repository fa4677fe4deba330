//! HTTP routes for C7 bill creation, posting, and void, each wrapped by C5's
//! idempotency gate per spec §6 (`Idempotency-Key` required on writes).

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use idempotency::{run_idempotent, IdempotencyError};
use inventory_rs::repos::item_repo::ItemError;
use inventory_rs::services::{location_service::LocationResolutionError, move_service::MoveError};
use platform_http_contracts::ApiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::bill_repo::{Bill, BillError, BillLine};
use crate::services::bill_service::{self, BillServiceError, CreateBillInput, CreateBillLineInput};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

fn bill_err(err: BillServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        BillServiceError::NoLines
        | BillServiceError::InvalidQuantity
        | BillServiceError::InvalidTaxRate(_)
        | BillServiceError::DiscountExceedsSubtotal { .. } => ApiError::validation(err.to_string()),
        BillServiceError::NotDraft { .. } | BillServiceError::NotVoidable { .. } => {
            ApiError::new(State, err.to_string())
        }
        BillServiceError::Bill(BillError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        BillServiceError::Bill(BillError::DuplicateNumber { .. }) => ApiError::validation(err.to_string()),
        BillServiceError::Bill(BillError::Database(_)) => ApiError::database_error(),
        BillServiceError::Payment(_) => ApiError::database_error(),
        BillServiceError::Item(ItemError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        BillServiceError::Item(_) => ApiError::validation(err.to_string()),
        BillServiceError::Location(LocationResolutionError::Unresolvable { .. }) => {
            ApiError::validation(err.to_string())
        }
        BillServiceError::Location(_) => ApiError::database_error(),
        BillServiceError::Move(MoveError::Recalc(_)) => ApiError::new(Integrity, err.to_string()),
        BillServiceError::Move(_) => ApiError::database_error(),
        BillServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        BillServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        BillServiceError::Posting(_) => ApiError::database_error(),
        BillServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct CreateBillLineBody {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub expense_account_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBillBody {
    pub vendor_id: Uuid,
    pub number: String,
    pub bill_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub location_id: Option<Uuid>,
    pub lines: Vec<CreateBillLineBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub bill: Bill,
    pub lines: Vec<BillLine>,
}

pub async fn create_bill(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CreateBillBody>,
) -> Result<Json<BillResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /bills", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let lines = body
            .lines
            .into_iter()
            .map(|l| CreateBillLineInput {
                item_id: l.item_id,
                description: l.description,
                quantity: l.quantity,
                unit_cost: l.unit_cost,
                discount_amount: l.discount_amount,
                tax_rate: l.tax_rate,
                expense_account_code: l.expense_account_code,
            })
            .collect();

        let (bill, lines) = bill_service::create_bill(
            tx,
            CreateBillInput {
                tenant_id,
                vendor_id: body.vendor_id,
                number: body.number,
                bill_date: body.bill_date,
                due_date: body.due_date,
                currency: body.currency,
                location_id: body.location_id,
                lines,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;

        Ok(BillResponse { bill, lines })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostedBillResponse {
    pub bill_id: Uuid,
    pub journal_entry_id: Uuid,
}

pub async fn post_bill(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, bill_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<PostedBillResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let fp = idempotency::fingerprint(tenant_id, "POST /bills/post", bill_id.as_bytes());
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let pool_ref = pool.clone();
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let posted = bill_service::post_bill(tx, &pool_ref, tenant_id, bill_id, closed)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(PostedBillResponse {
            bill_id: posted.bill.id,
            journal_entry_id: posted.journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoidedBillResponse {
    pub bill_id: Uuid,
    pub reversal_journal_entry_id: Uuid,
}

pub async fn void_bill(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, bill_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<VoidedBillResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let fp = idempotency::fingerprint(tenant_id, "POST /bills/void", bill_id.as_bytes());
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let pool_ref = pool.clone();
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let reversal_journal_entry_id = bill_service::void_bill(tx, &pool_ref, tenant_id, bill_id, closed)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(VoidedBillResponse {
            bill_id,
            reversal_journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

pub async fn get_bill(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, bill_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = crate::repos::bill_repo::find_by_id(pool.as_ref(), tenant_id, bill_id)
        .await
        .map_err(|e| bill_err(BillServiceError::Bill(e)))?;
    let lines = crate::repos::bill_repo::lines_for(pool.as_ref(), bill_id)
        .await
        .map_err(|e| bill_err(BillServiceError::Bill(e)))?;
    Ok(Json(BillResponse { bill, lines }))
}

pub async fn list_bills(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Bill>>, ApiError> {
    let bills = crate::repos::bill_repo::list(pool.as_ref(), tenant_id)
        .await
        .map_err(|_| ApiError::database_error())?;
    Ok(Json(bills))
}
