//! `JournalEntryInventoryValuation` — the idempotency anchor for C8 step 7:
//! the last compensating COGS delta already booked against a source journal
//! entry, so a repeated recalc over an unchanged window nets to zero.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn last_computed_cogs(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    source_journal_entry_id: Uuid,
) -> Result<Decimal, ValuationError> {
    let row: Option<(Decimal,)> = sqlx::query_as(
        "SELECT last_computed_cogs FROM journal_entry_inventory_valuations
         WHERE tenant_id = $1 AND source_journal_entry_id = $2",
    )
    .bind(tenant_id)
    .bind(source_journal_entry_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(v,)| v).unwrap_or(Decimal::ZERO))
}

pub async fn record_computed_cogs(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    source_journal_entry_id: Uuid,
    total_cogs: Decimal,
) -> Result<(), ValuationError> {
    sqlx::query(
        r#"
        INSERT INTO journal_entry_inventory_valuations
            (tenant_id, source_journal_entry_id, last_computed_cogs, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (tenant_id, source_journal_entry_id)
        DO UPDATE SET last_computed_cogs = $3, updated_at = now()
        "#,
    )
    .bind(tenant_id)
    .bind(source_journal_entry_id)
    .bind(total_cogs)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
