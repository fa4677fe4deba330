//! `IntegrationEntityMap` (spec §4.9): the dedupe and reference-linking
//! table behind C9's POS import. Every row ties one `(integration,
//! entityType, externalId)` triple to the local row it resolved to or
//! created, so a retried import with the same foreign id is a read, not a
//! re-creation.

use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct EntityMap {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub integration: String,
    pub entity_type: String,
    pub external_id: String,
    pub local_id: Uuid,
}

#[derive(Debug, Error)]
pub enum EntityMapError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn find(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    integration: &str,
    entity_type: &str,
    external_id: &str,
) -> Result<Option<EntityMap>, EntityMapError> {
    let row = sqlx::query_as::<_, EntityMap>(
        "SELECT id, tenant_id, integration, entity_type, external_id, local_id
         FROM integration_entity_map
         WHERE tenant_id = $1 AND integration = $2 AND entity_type = $3 AND external_id = $4",
    )
    .bind(tenant_id)
    .bind(integration)
    .bind(entity_type)
    .bind(external_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    integration: &str,
    entity_type: &str,
    external_id: &str,
    local_id: Uuid,
) -> Result<EntityMap, EntityMapError> {
    let row = sqlx::query_as::<_, EntityMap>(
        r#"
        INSERT INTO integration_entity_map (id, tenant_id, integration, entity_type, external_id, local_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, tenant_id, integration, entity_type, external_id, local_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(integration)
    .bind(entity_type)
    .bind(external_id)
    .bind(local_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Looks up an existing mapping, or creates one and returns it — the
/// write-once-read-many shape every auto-create resolution in C9 needs
/// after it has settled on a `local_id` (whether resolved or freshly
/// created).
pub async fn find_or_insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    integration: &str,
    entity_type: &str,
    external_id: &str,
    local_id: Uuid,
) -> Result<EntityMap, EntityMapError> {
    if let Some(existing) = find(tx, tenant_id, integration, entity_type, external_id).await? {
        return Ok(existing);
    }
    insert(tx, tenant_id, integration, entity_type, external_id, local_id).await
}
