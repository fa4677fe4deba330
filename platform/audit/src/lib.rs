//! Append-only audit trail for mutating commands across the ledger core.
//!
//! Every posting, payment, void, and period close records who did it and
//! when, plus a field-level diff where one is meaningful (e.g. a void
//! reason). This is intentionally thin: it is a write-only log, not a
//! workflow or approval engine — policy enforcement beyond "a reason string
//! is required for a void" is out of scope for the ledger core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize audit diff: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub actor_user_id: Option<Uuid>,
    pub reason: Option<String>,
    pub diff: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Appends one audit row within the caller's transaction, so it commits or
/// rolls back with the mutation it describes.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
    action: &str,
    actor_user_id: Option<Uuid>,
    reason: Option<&str>,
    diff: &serde_json::Value,
) -> Result<Uuid, AuditError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_entries
            (id, tenant_id, entity_type, entity_id, action, actor_user_id, reason, diff, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(entity_type)
    .bind(entity_id)
    .bind(action)
    .bind(actor_user_id)
    .bind(reason)
    .bind(diff)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

pub async fn history_for_entity(
    pool: &PgPool,
    tenant_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
) -> Result<Vec<AuditEntry>, AuditError> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT id, tenant_id, entity_type, entity_id, action, actor_user_id, reason, diff, recorded_at
        FROM audit_entries
        WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(tenant_id)
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for AuditEntry {
    fn from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        Ok(AuditEntry {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            action: row.try_get("action")?,
            actor_user_id: row.try_get("actor_user_id")?,
            reason: row.try_get("reason")?,
            diff: row.try_get("diff")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}
