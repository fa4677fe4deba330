//! Read-side projections derived from `journal.entry.created` events (C11).
//!
//! Grounded on the stub's own description ("Event projection framework with
//! cursor tracking, rebuild, and blue-green swap") and, for the apply-and-ack
//! shape, on `modules/gl/src/services/balance_updater.rs`'s idempotency
//! argument: because the GL posting path dedups on `source_event_id`, a
//! replayed event never produces a second journal entry, so the projection
//! only needs its own dedup — `ProcessedEvent` — to guard the one case that
//! remains, a redelivered event for an entry that already exists.

use chrono::NaiveDate;
use platform_contracts::JournalEntryCreatedV1;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Account classification needed to route a line into income/expense
/// contributions; mirrors `account_repo::AccountType` in `gl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountClass {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

pub struct ProjectionLine {
    pub account_id: Uuid,
    pub account_class: AccountClass,
    pub debit: rust_decimal::Decimal,
    pub credit: rust_decimal::Decimal,
}

/// Step 1 of the projection algorithm: attempt to record this event as
/// processed. Returns `false` (and does nothing else) if it was already
/// applied, so the caller can ack without reapplying.
pub async fn mark_processed_if_new(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    event_id: Uuid,
) -> Result<bool, ProjectionError> {
    let result = sqlx::query(
        "INSERT INTO processed_events (tenant_id, event_id, processed_at) VALUES ($1, $2, now())
         ON CONFLICT (tenant_id, event_id) DO NOTHING",
    )
    .bind(tenant_id)
    .bind(event_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Applies a `journal.entry.created` event's lines into `AccountBalance` and
/// `DailySummary`, per spec steps 3–4. Assumes [`mark_processed_if_new`] has
/// already returned `true` for this event within the same transaction.
pub async fn apply_journal_entry_created(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    day: NaiveDate,
    lines: &[ProjectionLine],
) -> Result<(), ProjectionError> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO daily_account_balances (tenant_id, day, account_id, debit_total, credit_total)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, day, account_id)
            DO UPDATE SET
                debit_total = daily_account_balances.debit_total + EXCLUDED.debit_total,
                credit_total = daily_account_balances.credit_total + EXCLUDED.credit_total
            "#,
        )
        .bind(tenant_id)
        .bind(day)
        .bind(line.account_id)
        .bind(line.debit)
        .bind(line.credit)
        .execute(&mut **tx)
        .await?;
    }

    let income_delta: rust_decimal::Decimal = lines
        .iter()
        .filter(|l| l.account_class == AccountClass::Income)
        .map(|l| l.credit - l.debit)
        .sum();
    let expense_delta: rust_decimal::Decimal = lines
        .iter()
        .filter(|l| l.account_class == AccountClass::Expense)
        .map(|l| l.debit - l.credit)
        .sum();

    if !income_delta.is_zero() || !expense_delta.is_zero() {
        sqlx::query(
            r#"
            INSERT INTO daily_summaries (tenant_id, day, total_income, total_expense)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, day)
            DO UPDATE SET
                total_income = daily_summaries.total_income + EXCLUDED.total_income,
                total_expense = daily_summaries.total_expense + EXCLUDED.total_expense
            "#,
        )
        .bind(tenant_id)
        .bind(day)
        .bind(income_delta)
        .bind(expense_delta)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// End-to-end handler: dedup, apply, and let the caller commit + ack.
pub async fn handle_journal_entry_created(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    event: &JournalEntryCreatedV1,
    lines: Vec<ProjectionLine>,
) -> Result<bool, ProjectionError> {
    if !mark_processed_if_new(tx, event.tenant_id, event_id).await? {
        return Ok(false);
    }
    apply_journal_entry_created(tx, event.tenant_id, event.posting_date, &lines).await?;
    Ok(true)
}

/// Clears `daily_account_balances`/`daily_summaries` for `tenant_id` in
/// `[from, to]`. Does not touch `processed_events` — this crate has no way
/// to map an event back to the posting date it projected into, so a caller
/// driving a rebuild (e.g. `tools/projection-rebuild`, which has the ledger
/// tables to do that join) is responsible for clearing the matching
/// `processed_events` rows itself before replaying, so the replay's own
/// `mark_processed_if_new` calls succeed instead of skipping every event as
/// already-processed.
pub async fn clear_range(
    pool: &PgPool,
    tenant_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), ProjectionError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM daily_account_balances WHERE tenant_id = $1 AND day BETWEEN $2 AND $3")
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM daily_summaries WHERE tenant_id = $1 AND day BETWEEN $2 AND $3")
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
