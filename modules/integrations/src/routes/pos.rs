//! HTTP routes for C9's external POS import: `X-Integration-Key` caller auth
//! (spec §6) plus the usual `Idempotency-Key` gate (C5), wrapping a second,
//! inner dedupe against `IntegrationEntityMap` by foreign id.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use idempotency::{run_idempotent, IdempotencyError};
use platform_http_contracts::ApiError;
use rust_decimal::Decimal;
use security::SecurityError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::pos_import_service::{self, PosPaymentInput, PosRefundInput, PosSaleInput, PosSaleLineInput};

pub struct IntegrationState {
    pub pool: Arc<PgPool>,
    pub integration_keys: Vec<String>,
}

fn integration_key_err(err: SecurityError) -> ApiError {
    ApiError::tenant(err.to_string())
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

fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty() && k.len() <= 128)
        .map(|k| k.to_string())
        .ok_or_else(|| ApiError::validation("Idempotency-Key header is required"))
}

fn check_integration_key(headers: &HeaderMap, known_keys: &[String]) -> Result<(), ApiError> {
    let provided = headers.get("X-Integration-Key").and_then(|v| v.to_str().ok());
    security::validate_integration_key(provided, known_keys).map_err(integration_key_err)
}

async fn closed_through(pool: &PgPool, tenant_id: Uuid) -> Option<NaiveDate> {
    tenant_registry::closed_through_date(pool, tenant_id).await.ok().flatten()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PosSaleLineBody {
    pub external_item_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PosPaymentBody {
    pub amount: Decimal,
    pub bank_account_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ImportSaleBody {
    pub sale_id: String,
    pub external_customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub currency: String,
    pub sale_date: NaiveDate,
    pub lines: Vec<PosSaleLineBody>,
    pub payment: Option<PosPaymentBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportedSaleResponse {
    pub invoice: ar_rs::repos::invoice_repo::Invoice,
    pub already_imported: bool,
}

pub async fn import_sale(
    State(state): State<Arc<IntegrationState>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ImportSaleBody>,
) -> Result<Json<ImportedSaleResponse>, ApiError> {
    check_integration_key(&headers, &state.integration_keys)?;
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /integrations/piti/sales", &canonical);
    let closed = closed_through(&state.pool, tenant_id).await;

    let mut tx = state.pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let lines = body
            .lines
            .into_iter()
            .map(|l| PosSaleLineInput {
                external_item_id: l.external_item_id,
                sku: l.sku,
                name: l.name,
                quantity: l.quantity,
                unit_price: l.unit_price,
                tax_rate: l.tax_rate,
            })
            .collect();

        let result = pos_import_service::import_sale(
            &state.pool,
            tx,
            PosSaleInput {
                tenant_id,
                external_sale_id: body.sale_id,
                external_customer_id: body.external_customer_id,
                customer_name: body.customer_name,
                customer_phone: body.customer_phone,
                currency: body.currency,
                sale_date: body.sale_date,
                lines,
                payment: body.payment.map(|p| PosPaymentInput {
                    amount: p.amount,
                    bank_account_code: p.bank_account_code,
                }),
                closed_through_date: closed,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;

        Ok(ImportedSaleResponse {
            invoice: result.invoice,
            already_imported: result.already_imported,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ImportRefundBody {
    pub refund_id: String,
    pub external_customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub currency: String,
    pub refund_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportedRefundResponse {
    pub credit_note_id: Uuid,
    pub already_imported: bool,
}

pub async fn import_refund(
    State(state): State<Arc<IntegrationState>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ImportRefundBody>,
) -> Result<Json<ImportedRefundResponse>, ApiError> {
    check_integration_key(&headers, &state.integration_keys)?;
    let key = idempotency_key(&headers)?;
    let canonical = serde_json::to_vec(&body).map_err(|_| ApiError::validation("invalid request body"))?;
    let fp = idempotency::fingerprint(tenant_id, "POST /integrations/piti/refunds", &canonical);
    let closed = closed_through(&state.pool, tenant_id).await;

    let mut tx = state.pool.begin().await.map_err(|_| ApiError::database_error())?;
    let outcome = run_idempotent(&mut tx, tenant_id, &key, &fp, |tx| async move {
        let result = pos_import_service::import_refund(
            &state.pool,
            tx,
            PosRefundInput {
                tenant_id,
                external_refund_id: body.refund_id,
                external_customer_id: body.external_customer_id,
                customer_name: body.customer_name,
                customer_phone: body.customer_phone,
                currency: body.currency,
                refund_date: body.refund_date,
                amount: body.amount,
                tax_amount: body.tax_amount,
                closed_through_date: closed,
            },
        )
        .await
        .map_err(|e| IdempotencyError::Build(Box::new(e)))?;

        Ok(ImportedRefundResponse {
            credit_note_id: result.credit_note_id,
            already_imported: result.already_imported,
        })
    })
    .await
    .map_err(idempotency_err)?;

    tx.commit().await.map_err(|_| ApiError::database_error())?;
    Ok(Json(outcome.into_inner()))
}
