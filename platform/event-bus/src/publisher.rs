//! Outbox publisher loop.
//!
//! Grounded on `ar-rs`'s `events::publisher::run_publisher_task`, which polls
//! every second and publishes a fixed-size batch to `ar.events.{event_type}`.
//! This version is not AR-specific: the subject is
//! `{aggregate_type}.events.{event_type}`, any module's rows share the one
//! physical `outbox_events` table, and a publish failure is recorded with
//! backoff instead of being retried immediately on the next poll tick.

use crate::outbox::{self, OutboxEvent};
use crate::EventBus;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The canonical wire envelope spec.md §4.10 step 2 / §6 describe: every
/// outbox row is wrapped in this shape before it reaches the bus, so a
/// downstream consumer never has to special-case which module produced it.
#[derive(Debug, Serialize)]
struct OutboxEnvelope<'a> {
    event_id: Uuid,
    event_type: &'a str,
    schema_version: i32,
    occurred_at: chrono::DateTime<Utc>,
    tenant_id: Option<Uuid>,
    partition_key: Option<&'a str>,
    correlation_id: Option<&'a str>,
    causation_id: Option<&'a str>,
    aggregate_type: &'a str,
    aggregate_id: Uuid,
    source: &'a str,
    payload: &'a serde_json::Value,
}

impl<'a> OutboxEnvelope<'a> {
    fn wrap(event: &'a OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            event_type: &event.event_type,
            schema_version: event.schema_version,
            occurred_at: event.created_at,
            tenant_id: event.tenant_id,
            partition_key: event.partition_key.as_deref(),
            correlation_id: event.correlation_id.as_deref(),
            causation_id: event.causation_id.as_deref(),
            aggregate_type: &event.aggregate_type,
            aggregate_id: event.aggregate_id,
            source: event.source.as_deref().unwrap_or(&event.aggregate_type),
            payload: &event.payload,
        }
    }
}

pub struct PublisherConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub lease_duration: ChronoDuration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
            lease_duration: ChronoDuration::seconds(30),
        }
    }
}

fn subject_for(event: &OutboxEvent) -> String {
    format!("{}.events.{}", event.aggregate_type, event.event_type)
}

/// Runs the outbox relay loop until the process is shut down. Each tick,
/// claims a batch of due rows, publishes each to the bus, and marks it
/// published on success or schedules backoff on failure. Rows with no
/// resolvable `tenant_id` are dead-lettered rather than published, since a
/// consumer has no way to apply tenant isolation to them.
pub async fn run_publisher_loop(pool: PgPool, bus: Arc<dyn EventBus>, config: PublisherConfig) {
    let replica_id = Uuid::new_v4();
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        ticker.tick().await;
        match outbox::claim_batch(&pool, replica_id, config.lease_duration, config.batch_size)
            .await
        {
            Ok(batch) => {
                for event in batch {
                    publish_one(&pool, bus.as_ref(), event).await;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to claim outbox batch");
            }
        }
    }
}

async fn publish_one(pool: &PgPool, bus: &dyn EventBus, event: OutboxEvent) {
    if event.tenant_id.is_none() {
        warn!(event_id = %event.id, "dead-lettering outbox event with no tenant_id");
        if let Err(e) = outbox::dead_letter(pool, event.id, "missing tenant_id").await {
            error!(event_id = %event.id, error = %e, "failed to dead-letter event");
        }
        return;
    }

    let subject = subject_for(&event);
    let envelope = match serde_json::to_vec(&OutboxEnvelope::wrap(&event)) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(event_id = %event.id, error = %e, "failed to serialize outbox envelope");
            let _ = outbox::dead_letter(pool, event.id, "payload serialization failure").await;
            return;
        }
    };

    match bus.publish(&subject, envelope).await {
        Ok(()) => {
            if let Err(e) = outbox::mark_published(pool, event.id).await {
                error!(event_id = %event.id, error = %e, "failed to mark outbox event published");
            } else {
                info!(event_id = %event.id, subject = %subject, "published outbox event");
            }
        }
        Err(e) => {
            warn!(event_id = %event.id, attempts = event.attempts, error = %e, "outbox publish failed, backing off");
            if let Err(e) = outbox::record_publish_failure(pool, event.id, event.attempts).await {
                error!(event_id = %event.id, error = %e, "failed to record publish failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event() -> OutboxEvent {
        let tenant_id = Uuid::new_v4();
        OutboxEvent {
            id: Uuid::new_v4(),
            tenant_id: Some(tenant_id),
            aggregate_type: "journal_entry".to_string(),
            aggregate_id: Uuid::new_v4(),
            event_type: "created".to_string(),
            schema_version: 1,
            source: Some("gl".to_string()),
            partition_key: Some(tenant_id.to_string()),
            correlation_id: Some("corr-1".to_string()),
            causation_id: None,
            payload: serde_json::json!({}),
            created_at: Utc::now(),
            published_at: None,
            attempts: 0,
            next_publish_attempt_at: Utc::now(),
            lease_owner: None,
            leased_until: None,
            dead_lettered_at: None,
            dead_letter_reason: None,
        }
    }

    #[test]
    fn subject_is_aggregate_scoped() {
        assert_eq!(subject_for(&sample_event()), "journal_entry.events.created");
    }

    #[test]
    fn envelope_carries_correlation_and_partition_key() {
        let event = sample_event();
        let envelope = OutboxEnvelope::wrap(&event);
        assert_eq!(envelope.correlation_id, Some("corr-1"));
        assert_eq!(envelope.partition_key, event.partition_key.as_deref());
        assert_eq!(envelope.source, "gl");
        assert_eq!(envelope.aggregate_type, "journal_entry");
    }

    #[test]
    fn envelope_falls_back_to_aggregate_type_when_source_missing() {
        let mut event = sample_event();
        event.source = None;
        let envelope = OutboxEnvelope::wrap(&event);
        assert_eq!(envelope.source, "journal_entry");
    }
}
