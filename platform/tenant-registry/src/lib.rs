//! Tenant identity and the per-tenant period-close anchor (C2, C12).
//!
//! Grounded on the `tenant-registry` stub's own description ("Tenant CRUD,
//! lifecycle management, plan tiers, and fleet summary") scoped down to what
//! the ledger core actually needs: a tenant row, its `closedThroughDate`, and
//! a request-scoped [`TenantContext`] that every module's handlers take
//! instead of reaching for ambient/global state, matching the spec's explicit
//! requirement that tenant context be request-scoped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("tenant not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub closed_through_date: Option<NaiveDate>,
    pub default_currency: String,
}

/// Resolved per-request tenant identity, constructed once at the edge (from
/// a verified bearer token's `tenant_id` claim, see `security`) and threaded
/// explicitly through every call — never read from a global/thread-local, so
/// that forgetting to pass it is a compile error rather than a silent
/// cross-tenant leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Uuid,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }
}

pub async fn find_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Tenant, TenantError> {
    sqlx::query_as::<_, Tenant>(
        "SELECT id, name, closed_through_date, default_currency FROM tenants WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or(TenantError::NotFound)
}

pub async fn closed_through_date(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<NaiveDate>, TenantError> {
    let row: Option<(Option<NaiveDate>,)> =
        sqlx::query_as("SELECT closed_through_date FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(pool)
            .await?;
    row.map(|(d,)| d).ok_or(TenantError::NotFound)
}

/// `closedThroughDate` is inclusive: a transaction dated on or before it is
/// rejected. Every creating/reversing write on a JournalEntry calls this
/// before committing.
pub fn assert_period_open(
    closed_through: Option<NaiveDate>,
    transaction_date: NaiveDate,
) -> Result<(), PeriodClosedError> {
    match closed_through {
        Some(closed) if transaction_date <= closed => Err(PeriodClosedError {
            closed_through_date: closed,
            transaction_date,
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("transaction date {transaction_date} is not after closed-through date {closed_through_date}")]
pub struct PeriodClosedError {
    pub closed_through_date: NaiveDate,
    pub transaction_date: NaiveDate,
}

pub async fn update_closed_through_date(
    pool: &PgPool,
    tenant_id: Uuid,
    new_date: NaiveDate,
) -> Result<(), TenantError> {
    let result = sqlx::query("UPDATE tenants SET closed_through_date = $2 WHERE id = $1")
        .bind(tenant_id)
        .bind(new_date)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(TenantError::NotFound);
    }
    Ok(())
}
