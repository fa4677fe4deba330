use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct Vendor {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("vendor not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },

    #[error("display_name must not be empty")]
    EmptyName,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn insert(
    pool: &PgPool,
    tenant_id: Uuid,
    display_name: &str,
    external_ref: Option<&str>,
) -> Result<Vendor, VendorError> {
    if display_name.trim().is_empty() {
        return Err(VendorError::EmptyName);
    }
    let id = Uuid::new_v4();
    let vendor = sqlx::query_as::<_, Vendor>(
        r#"
        INSERT INTO vendors (id, tenant_id, display_name, external_ref)
        VALUES ($1, $2, $3, $4)
        RETURNING id, tenant_id, display_name, external_ref, created_at
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(display_name)
    .bind(external_ref)
    .fetch_one(pool)
    .await?;
    Ok(vendor)
}

pub async fn find_by_id(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<Vendor>, VendorError> {
    let vendor = sqlx::query_as::<_, Vendor>(
        "SELECT id, tenant_id, display_name, external_ref, created_at
         FROM vendors WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(vendor)
}

pub async fn find_by_external_ref(
    pool: &PgPool,
    tenant_id: Uuid,
    external_ref: &str,
) -> Result<Option<Vendor>, VendorError> {
    let vendor = sqlx::query_as::<_, Vendor>(
        "SELECT id, tenant_id, display_name, external_ref, created_at
         FROM vendors WHERE tenant_id = $1 AND external_ref = $2",
    )
    .bind(tenant_id)
    .bind(external_ref)
    .fetch_optional(pool)
    .await?;
    Ok(vendor)
}

pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Vendor>, VendorError> {
    let vendors = sqlx::query_as::<_, Vendor>(
        "SELECT id, tenant_id, display_name, external_ref, created_at
         FROM vendors WHERE tenant_id = $1 ORDER BY display_name ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(vendors)
}

pub async fn find_or_create_by_external_ref(
    pool: &PgPool,
    tenant_id: Uuid,
    display_name: &str,
    external_ref: Option<&str>,
) -> Result<Vendor, VendorError> {
    if let Some(ext_ref) = external_ref {
        if let Some(existing) = find_by_external_ref(pool, tenant_id, ext_ref).await? {
            return Ok(existing);
        }
    }
    insert(pool, tenant_id, display_name, external_ref).await
}
