//! HTTP routes for C6 invoice creation, posting, and void, each wrapped by
//! C5's idempotency gate per spec §6 (`Idempotency-Key` required on writes).

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use idempotency::{run_idempotent, IdempotencyError, IdempotencyOutcome};
use inventory_rs::repos::item_repo::ItemError;
use inventory_rs::services::{location_service::LocationResolutionError, move_service::MoveError};
use platform_http_contracts::ApiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::invoice_repo::{Invoice, InvoiceError, InvoiceLine};
use crate::services::invoice_service::{self, CreateInvoiceInput, CreateInvoiceLineInput, InvoiceServiceError};

fn idempotency_err(err: IdempotencyError) -> ApiError {
    match err {
        IdempotencyError::FingerprintMismatch { key } => ApiError::new(
            platform_http_contracts::ErrorKind::IdempotencyConflict,
            format!("idempotency key '{key}' was reused with a different request body"),
        ),
        _ => ApiError::database_error(),
    }
}

pub(crate) fn invoice_err(err: InvoiceServiceError) -> ApiError {
    use platform_http_contracts::ErrorKind::*;
    match err {
        InvoiceServiceError::NoLines
        | InvoiceServiceError::InvalidQuantity
        | InvoiceServiceError::InvalidTaxRate(_)
        | InvoiceServiceError::DiscountExceedsSubtotal { .. } => ApiError::validation(err.to_string()),
        InvoiceServiceError::NotDraft { .. } | InvoiceServiceError::NotVoidable { .. } => {
            ApiError::new(State, err.to_string())
        }
        InvoiceServiceError::Invoice(InvoiceError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        InvoiceServiceError::Invoice(InvoiceError::DuplicateNumber { .. }) => {
            ApiError::validation(err.to_string())
        }
        InvoiceServiceError::Invoice(InvoiceError::Database(_)) => ApiError::database_error(),
        InvoiceServiceError::Payment(_) => ApiError::database_error(),
        InvoiceServiceError::Item(ItemError::NotFound { .. }) => ApiError::not_found(err.to_string()),
        InvoiceServiceError::Item(_) => ApiError::validation(err.to_string()),
        InvoiceServiceError::Location(LocationResolutionError::Unresolvable { .. }) => {
            ApiError::validation(err.to_string())
        }
        InvoiceServiceError::Location(_) => ApiError::database_error(),
        InvoiceServiceError::Move(MoveError::Recalc(_)) => ApiError::new(Integrity, err.to_string()),
        InvoiceServiceError::Move(_) => ApiError::database_error(),
        InvoiceServiceError::Posting(gl_rs::posting::PostingError::Validation(_)) => {
            ApiError::new(Imbalance, err.to_string())
        }
        InvoiceServiceError::Posting(gl_rs::posting::PostingError::PeriodClosed(_)) => {
            ApiError::new(PeriodClosed, err.to_string())
        }
        InvoiceServiceError::Posting(_) => ApiError::database_error(),
        InvoiceServiceError::Outbox(_) => ApiError::database_error(),
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
pub struct CreateInvoiceLineBody {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub income_account_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateInvoiceBody {
    pub customer_id: Uuid,
    pub number: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub location_id: Option<Uuid>,
    pub lines: Vec<CreateInvoiceLineBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

pub async fn create_invoice(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CreateInvoiceBody>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /invoices", &canonical);

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let lines = body
            .lines
            .into_iter()
            .map(|l| CreateInvoiceLineInput {
                item_id: l.item_id,
                description: l.description,
                quantity: l.quantity,
                unit_price: l.unit_price,
                discount_amount: l.discount_amount,
                tax_rate: l.tax_rate,
                income_account_code: l.income_account_code,
            })
            .collect();

        let (invoice, lines) = invoice_service::create_invoice(
            tx,
            CreateInvoiceInput {
                tenant_id,
                customer_id: body.customer_id,
                number: body.number,
                invoice_date: body.invoice_date,
                due_date: body.due_date,
                currency: body.currency,
                location_id: body.location_id,
                lines,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;

        Ok(InvoiceResponse { invoice, lines })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostedInvoiceResponse {
    pub invoice_id: Uuid,
    pub journal_entry_id: Uuid,
}

pub async fn post_invoice(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, invoice_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<PostedInvoiceResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let fp = idempotency::fingerprint(tenant_id, "POST /invoices/post", invoice_id.as_bytes());
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let pool_ref = pool.clone();
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let posted = invoice_service::post_invoice(tx, &pool_ref, tenant_id, invoice_id, closed)
            .await
            .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(PostedInvoiceResponse {
            invoice_id: posted.invoice.id,
            journal_entry_id: posted.journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoidedInvoiceResponse {
    pub invoice_id: Uuid,
    pub reversal_journal_entry_id: Uuid,
}

pub async fn void_invoice(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, invoice_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<VoidedInvoiceResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let fp = idempotency::fingerprint(tenant_id, "POST /invoices/void", invoice_id.as_bytes());
    let closed = closed_through(&pool, tenant_id).await;

    let mut tx = pool.begin().await.map_err(|_| ApiError::database_error())?;
    let pool_ref = pool.clone();
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let reversal_journal_entry_id =
            invoice_service::void_invoice(tx, &pool_ref, tenant_id, invoice_id, closed)
                .await
                .map_err(|e| IdempotencyError::Build(Box::new(e)))?;
        Ok(VoidedInvoiceResponse {
            invoice_id,
            reversal_journal_entry_id,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicLinkResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Mints a signed, expiring token scoped to this one `(tenant_id, invoice_id)`
/// pair (spec §6 `POST .../invoices/{id}/public-link`). Not idempotency-gated:
/// the token is self-contained and stateless, so minting it twice just
/// produces two valid tokens rather than a duplicated side effect.
pub async fn mint_public_link(
    State(pool): State<Arc<PgPool>>,
    axum::Extension(secret): axum::Extension<std::sync::Arc<String>>,
    Path((tenant_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PublicLinkResponse>, ApiError> {
    crate::repos::invoice_repo::find_by_id(pool.as_ref(), tenant_id, invoice_id)
        .await
        .map_err(|e| invoice_err(InvoiceServiceError::Invoice(e)))?;

    let ttl = chrono::Duration::days(7);
    let token = security::public_link::mint_public_link_token(secret.as_bytes(), tenant_id, invoice_id, ttl);
    Ok(Json(PublicLinkResponse {
        token,
        expires_at: chrono::Utc::now() + ttl,
    }))
}

pub async fn get_invoice(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = crate::repos::invoice_repo::find_by_id(pool.as_ref(), tenant_id, invoice_id)
        .await
        .map_err(|e| invoice_err(InvoiceServiceError::Invoice(e)))?;
    let lines = crate::repos::invoice_repo::lines_for(pool.as_ref(), invoice_id)
        .await
        .map_err(|e| invoice_err(InvoiceServiceError::Invoice(e)))?;
    Ok(Json(InvoiceResponse { invoice, lines }))
}

pub async fn list_invoices(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let invoices = crate::repos::invoice_repo::list(pool.as_ref(), tenant_id)
        .await
        .map_err(|_| ApiError::database_error())?;
    Ok(Json(invoices))
}
