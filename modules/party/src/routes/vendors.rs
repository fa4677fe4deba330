use axum::{
    extract::{Path, State},
    Json,
};
use platform_http_contracts::ApiError;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::vendor_repo::{self, Vendor, VendorError};

fn map_err(err: VendorError) -> ApiError {
    match err {
        VendorError::EmptyName => ApiError::validation(err.to_string()),
        VendorError::NotFound { .. } => ApiError::not_found(err.to_string()),
        VendorError::Database(_) => ApiError::database_error(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorBody {
    pub display_name: String,
    pub external_ref: Option<String>,
}

pub async fn create_vendor(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<CreateVendorBody>,
) -> Result<Json<Vendor>, ApiError> {
    let vendor = vendor_repo::insert(&pool, tenant_id, &body.display_name, body.external_ref.as_deref())
        .await
        .map_err(map_err)?;
    Ok(Json(vendor))
}

pub async fn list_vendors(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Vendor>>, ApiError> {
    let vendors = vendor_repo::list(&pool, tenant_id).await.map_err(map_err)?;
    Ok(Json(vendors))
}

pub async fn get_vendor(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vendor>, ApiError> {
    let vendor = vendor_repo::find_by_id(&pool, tenant_id, id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found("vendor not found"))?;
    Ok(Json(vendor))
}
