//! The last rung of C8's location-resolution ladder: a per-tenant default
//! location. `Location` has no dedicated entity in this core — it is an
//! opaque id referenced by documents and items — so this table is nothing
//! more than `tenantId -> defaultLocationId`.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LocationSettingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn tenant_default_location(
    pool: &PgPool,
    tenant_id: &str,
) -> Result<Option<Uuid>, LocationSettingError> {
    let row: Option<(Option<Uuid>,)> = sqlx::query_as(
        "SELECT default_location_id FROM tenant_inventory_settings WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.and_then(|(id,)| id))
}

pub async fn set_tenant_default_location(
    pool: &PgPool,
    tenant_id: &str,
    location_id: Uuid,
) -> Result<(), LocationSettingError> {
    sqlx::query(
        r#"
        INSERT INTO tenant_inventory_settings (tenant_id, default_location_id)
        VALUES ($1, $2)
        ON CONFLICT (tenant_id) DO UPDATE SET default_location_id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(location_id)
    .execute(pool)
    .await?;
    Ok(())
}
