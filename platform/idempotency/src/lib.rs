//! Generic at-most-once command execution keyed by `(tenantId, idempotencyKey)`.
//!
//! `ar-rs`'s `idempotency` module hashes only the raw idempotency key and
//! keys storage by `app_id`, with the tenant resolution stubbed out behind a
//! `// TODO: Extract from auth middleware` placeholder. This crate keeps that
//! module's shape — SHA-256 fingerprint, a row per key, replayed-response
//! storage — but corrects the key material to `(tenant_id, idempotency_key)`
//! and the fingerprint to cover the whole request (route + canonicalised
//! body + tenant), so that reusing a key with a different request body is
//! detected as a conflict rather than silently replayed.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use std::future::Future;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("idempotency key {key} was reused with a different request body")]
    FingerprintMismatch { key: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize stored response: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Build(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug)]
pub enum IdempotencyOutcome<T> {
    /// `build` ran and produced a fresh result, now persisted for replay.
    Executed(T),
    /// A prior call with the same key and fingerprint already ran; its
    /// stored response is returned without re-executing `build`.
    Replayed(T),
}

impl<T> IdempotencyOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            IdempotencyOutcome::Executed(t) => t,
            IdempotencyOutcome::Replayed(t) => t,
        }
    }

    pub fn was_replayed(&self) -> bool {
        matches!(self, IdempotencyOutcome::Replayed(_))
    }
}

/// Builds the fingerprint the store compares against on key reuse: a hash of
/// the route, the tenant, and the canonicalised request body. Callers should
/// serialize the request to a stable JSON form (sorted keys) before passing
/// it here.
pub fn fingerprint(tenant_id: Uuid, route: &str, canonical_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(b"|");
    hasher.update(route.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_body);
    hex::encode(hasher.finalize())
}

fn advisory_lock_key(tenant_id: Uuid, key: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    i64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest >= 8 bytes"))
}

#[derive(sqlx::FromRow)]
struct StoredRecord {
    fingerprint_hash: String,
    response_body: serde_json::Value,
}

/// Runs `build` at most once for a given `(tenant_id, key)` pair within the
/// caller's transaction. On first use, `build`'s result is persisted and
/// returned as [`IdempotencyOutcome::Executed`]; on replay with a matching
/// fingerprint, the stored result is returned as
/// [`IdempotencyOutcome::Replayed`] without calling `build` again. A replay
/// with a mismatched fingerprint is rejected as [`IdempotencyError::FingerprintMismatch`].
///
/// Concurrency between two requests racing on the same key is resolved by a
/// `pg_advisory_xact_lock` held for the duration of the call, scoped to the
/// caller's transaction and released automatically on commit or rollback.
pub async fn run_idempotent<'a, 'c, T, F, Fut>(
    tx: &'a mut Transaction<'c, Postgres>,
    tenant_id: Uuid,
    key: &str,
    request_fingerprint: &str,
    build: F,
) -> Result<IdempotencyOutcome<T>, IdempotencyError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&'a mut Transaction<'c, Postgres>) -> Fut,
    Fut: Future<Output = Result<T, IdempotencyError>>,
{
    let lock_key = advisory_lock_key(tenant_id, key);
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(lock_key)
        .execute(&mut **tx)
        .await?;

    let existing: Option<StoredRecord> = sqlx::query_as(
        r#"
        SELECT fingerprint_hash, response_body
        FROM idempotency_records
        WHERE tenant_id = $1 AND idempotency_key = $2
        "#,
    )
    .bind(tenant_id)
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(record) = existing {
        if record.fingerprint_hash != request_fingerprint {
            return Err(IdempotencyError::FingerprintMismatch {
                key: key.to_string(),
            });
        }
        let response: T = serde_json::from_value(record.response_body)?;
        return Ok(IdempotencyOutcome::Replayed(response));
    }

    let result = build(tx).await?;
    let response_body = serde_json::to_value(&result)?;

    sqlx::query(
        r#"
        INSERT INTO idempotency_records (tenant_id, idempotency_key, fingerprint_hash, response_body, created_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (tenant_id, idempotency_key) DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(key)
    .bind(request_fingerprint)
    .bind(&response_body)
    .execute(&mut **tx)
    .await?;

    Ok(IdempotencyOutcome::Executed(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_tenant_scoped() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let a = fingerprint(t1, "/invoices", b"{}");
        let b = fingerprint(t1, "/invoices", b"{}");
        let c = fingerprint(t2, "/invoices", b"{}");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_changes_with_body() {
        let t = Uuid::new_v4();
        let a = fingerprint(t, "/invoices", b"{\"amount\":1}");
        let b = fingerprint(t, "/invoices", b"{\"amount\":2}");
        assert_ne!(a, b);
    }

    #[test]
    fn advisory_lock_key_is_deterministic() {
        let t = Uuid::new_v4();
        assert_eq!(advisory_lock_key(t, "k1"), advisory_lock_key(t, "k1"));
        assert_ne!(advisory_lock_key(t, "k1"), advisory_lock_key(t, "k2"));
    }
}
