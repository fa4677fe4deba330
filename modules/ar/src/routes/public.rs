//! Anonymous invoice view backing the public share link (spec §6
//! `GET /public/invoices/{token}`). No tenant header, no bearer token: the
//! signed token itself carries the `(tenant_id, invoice_id)` pair that
//! `get_invoice` would otherwise take from the path.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use platform_http_contracts::ApiError;
use sqlx::PgPool;
use std::sync::Arc;

use crate::routes::invoices::{invoice_err, InvoiceResponse};
use crate::services::invoice_service::InvoiceServiceError;

pub async fn get_public_invoice(
    State(pool): State<Arc<PgPool>>,
    Extension(secret): Extension<Arc<String>>,
    Path(token): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let claims = security::public_link::verify_public_link_token(secret.as_bytes(), &token)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let invoice = crate::repos::invoice_repo::find_by_id(pool.as_ref(), claims.tenant_id, claims.invoice_id)
        .await
        .map_err(|e| invoice_err(InvoiceServiceError::Invoice(e)))?;
    let lines = crate::repos::invoice_repo::lines_for(pool.as_ref(), claims.invoice_id)
        .await
        .map_err(|e| invoice_err(InvoiceServiceError::Invoice(e)))?;
    Ok(Json(InvoiceResponse { invoice, lines }))
}
