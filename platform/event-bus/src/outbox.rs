//! Transactional outbox: rows are written in the same DB transaction as the
//! business mutation that caused them, then relayed to the [`crate::EventBus`]
//! by a separate publisher loop.
//!
//! `ar-rs`'s `events::outbox` module is the shape this is grounded on
//! (`enqueue_event`, `fetch_unpublished_events`, `mark_as_published` against
//! an `events_outbox` table) but that version has no row leasing at all —
//! any number of publisher replicas polling concurrently would double-publish.
//! This version adds the `FOR UPDATE SKIP LOCKED` claim, a lease column so a
//! crashed replica's claim is eventually reclaimed, and exponential backoff
//! on publish failure, capped at 60s as required of the outbox relay.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, FromRow)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub schema_version: i32,
    /// Producer id, e.g. "ar", "gl", "inventory" (spec.md §3/§6 `source`).
    pub source: Option<String>,
    /// = `tenant_id` stringified; spec.md §4.10 step 2 partitions delivery
    /// on this so a consumer can shard by tenant.
    pub partition_key: Option<String>,
    /// Links every outbox row produced by one business transaction. Set by
    /// the caller when events must be grouped (e.g. an inventory recalc's
    /// compensating entries); otherwise a fresh id per spec.md §4.4 ("new if
    /// absent").
    pub correlation_id: Option<String>,
    /// Optional upstream cause, e.g. the source journal entry a compensating
    /// entry adjusts (spec.md §4.8 step 8).
    pub causation_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub next_publish_attempt_at: DateTime<Utc>,
    pub lease_owner: Option<Uuid>,
    pub leased_until: Option<DateTime<Utc>>,
    pub dead_lettered_at: Option<DateTime<Utc>>,
    pub dead_letter_reason: Option<String>,
}

/// Caps exponential backoff on publish retries at 60 seconds: `2^attempts`,
/// clamped.
pub fn backoff_after(attempts: i32) -> Duration {
    let capped_exponent = attempts.clamp(0, 6); // 2^6 = 64s, clamp below that
    let secs = 2i64.saturating_pow(capped_exponent as u32).min(60);
    Duration::seconds(secs)
}

/// Inserts an outbox row within the caller's transaction, so it commits or
/// rolls back atomically with the business write that produced it.
///
/// `tenant_id` is `None` only for platform-level events with no tenant scope;
/// everything C9/C10 produces carries a tenant, and a row without one that a
/// publisher cannot resolve is dead-lettered rather than dropped.
///
/// `source` defaults to `aggregate_type` and `correlation_id` to
/// `aggregate_id` — a reasonable default grouping for callers with no
/// specific business-transaction correlation to carry. Callers that do have
/// one (e.g. `gl::posting` tying a `journal.entry.created` event to the
/// document that caused it, or inventory recalc tying a compensating entry
/// back to the source journal entry it adjusts) should call
/// [`enqueue_correlated`] directly instead.
pub async fn enqueue<T: Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Option<Uuid>,
    aggregate_type: &str,
    aggregate_id: Uuid,
    event_type: &str,
    schema_version: i32,
    payload: &T,
) -> Result<Uuid, OutboxError> {
    enqueue_correlated(
        tx,
        tenant_id,
        aggregate_type,
        aggregate_id,
        event_type,
        schema_version,
        aggregate_type,
        Some(aggregate_id.to_string()),
        None,
        payload,
    )
    .await
}

/// Full-control variant of [`enqueue`] taking an explicit `source` and
/// optional `correlation_id`/`causation_id`, per spec.md §3's OutboxEvent row
/// and §4.10 step 2's canonical envelope. `correlation_id` defaults to a
/// fresh id (spec.md §4.4: "new if absent") when `None`.
#[allow(clippy::too_many_arguments)]
pub async fn enqueue_correlated<T: Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Option<Uuid>,
    aggregate_type: &str,
    aggregate_id: Uuid,
    event_type: &str,
    schema_version: i32,
    source: &str,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    payload: &T,
) -> Result<Uuid, OutboxError> {
    let id = Uuid::new_v4();
    let partition_key = tenant_id.map(|t| t.to_string());
    let correlation_id = correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let payload_json = serde_json::to_value(payload)?;
    sqlx::query(
        r#"
        INSERT INTO outbox_events
            (id, tenant_id, aggregate_type, aggregate_id, event_type, schema_version,
             source, partition_key, correlation_id, causation_id,
             payload, created_at, attempts, next_publish_attempt_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), 0, now())
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(aggregate_type)
    .bind(aggregate_id)
    .bind(event_type)
    .bind(schema_version)
    .bind(source)
    .bind(&partition_key)
    .bind(&correlation_id)
    .bind(&causation_id)
    .bind(&payload_json)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

/// Claims up to `limit` due, unpublished, non-dead-lettered rows for this
/// publisher replica, skipping rows already locked by another replica's
/// concurrent claim and rows whose lease from a previous claim hasn't expired.
pub async fn claim_batch(
    pool: &PgPool,
    owner: Uuid,
    lease_for: Duration,
    limit: i64,
) -> Result<Vec<OutboxEvent>, OutboxError> {
    let mut tx = pool.begin().await?;
    let rows: Vec<OutboxEvent> = sqlx::query_as(
        r#"
        SELECT id, tenant_id, aggregate_type, aggregate_id, event_type, schema_version,
               source, partition_key, correlation_id, causation_id,
               payload, created_at, published_at, attempts, next_publish_attempt_at,
               lease_owner, leased_until, dead_lettered_at, dead_letter_reason
        FROM outbox_events
        WHERE published_at IS NULL
          AND dead_lettered_at IS NULL
          AND next_publish_attempt_at <= now()
          AND (leased_until IS NULL OR leased_until <= now())
        ORDER BY created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *tx)
    .await?;

    let leased_until = Utc::now() + lease_for;
    for row in &rows {
        sqlx::query(
            "UPDATE outbox_events SET lease_owner = $1, leased_until = $2 WHERE id = $3",
        )
        .bind(owner)
        .bind(leased_until)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(rows)
}

pub async fn mark_published(pool: &PgPool, id: Uuid) -> Result<(), OutboxError> {
    sqlx::query(
        "UPDATE outbox_events SET published_at = now(), lease_owner = NULL, leased_until = NULL WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a failed publish attempt, bumping the attempt counter and
/// scheduling the next retry per [`backoff_after`].
pub async fn record_publish_failure(
    pool: &PgPool,
    id: Uuid,
    attempts_before: i32,
) -> Result<(), OutboxError> {
    let next_attempt = Utc::now() + backoff_after(attempts_before + 1);
    sqlx::query(
        r#"
        UPDATE outbox_events
        SET attempts = attempts + 1, next_publish_attempt_at = $2, lease_owner = NULL, leased_until = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(next_attempt)
    .execute(pool)
    .await?;
    Ok(())
}

/// Dead-letters a row the publisher cannot route — most commonly an event
/// with no resolvable tenant.
pub async fn dead_letter(pool: &PgPool, id: Uuid, reason: &str) -> Result<(), OutboxError> {
    sqlx::query(
        r#"
        UPDATE outbox_events
        SET dead_lettered_at = now(), dead_letter_reason = $2, lease_owner = NULL, leased_until = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}
