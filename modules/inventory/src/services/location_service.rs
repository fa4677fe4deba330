//! C8 location resolution: document location -> item default location ->
//! tenant default location -> reject if null and the item is tracked.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::repos::item_repo::Item;
use crate::repos::location_repo::{self, LocationSettingError};

#[derive(Debug, Error)]
pub enum LocationResolutionError {
    #[error("item '{item_id}' is inventory-tracked but no location could be resolved")]
    Unresolvable { item_id: Uuid },
    #[error(transparent)]
    Setting(#[from] LocationSettingError),
}

pub async fn resolve_location(
    pool: &PgPool,
    tenant_id: &str,
    item: &Item,
    document_location_id: Option<Uuid>,
) -> Result<Option<Uuid>, LocationResolutionError> {
    if let Some(loc) = document_location_id {
        return Ok(Some(loc));
    }
    if let Some(loc) = item.default_location_id {
        return Ok(Some(loc));
    }
    if let Some(loc) = location_repo::tenant_default_location(pool, tenant_id).await? {
        return Ok(Some(loc));
    }
    if item.track_inventory {
        return Err(LocationResolutionError::Unresolvable { item_id: item.id });
    }
    Ok(None)
}
