//! Rebuilds the C11 read-side projections (`daily_account_balances`,
//! `daily_summaries`) for one tenant over a date range, by replaying
//! `journal_entries`/`journal_lines` directly rather than relying on
//! redelivery of the original `journal.entry.created` events.
//!
//! # Usage
//! ```bash
//! projection-rebuild --tenant-id 11111111-1111-1111-1111-111111111111 \
//!     --from 2026-01-01 --to 2026-01-31
//! ```
//!
//! # Safety
//! - Operates on one tenant at a time.
//! - Clears `processed_events` rows for the range before replaying, so the
//!   replay's own dedup insert succeeds instead of silently skipping every
//!   entry as already-processed.
//! - One transaction per journal entry, mirroring the live projection
//!   worker's own per-event transaction shape — a crash partway through
//!   leaves the range in a consistent, resumable state rather than holding
//!   one lock across the whole window.

use chrono::{Datelike, NaiveDate};
use clap::Parser;
use gl_rs::repos::account_repo::AccountType;
use projections::{AccountClass, ProjectionLine};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "projection-rebuild", about = "Rebuild C11 projections for a tenant over a date range")]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long)]
    tenant_id: Uuid,

    #[arg(long)]
    from: NaiveDate,

    #[arg(long)]
    to: NaiveDate,
}

#[derive(Debug, FromRow)]
struct LedgerLine {
    entry_id: Uuid,
    posted_at: chrono::DateTime<chrono::Utc>,
    account_id: Uuid,
    #[sqlx(rename = "type")]
    account_type: AccountType,
    debit_minor: i64,
    credit_minor: i64,
}

fn to_account_class(account_type: AccountType) -> AccountClass {
    match account_type {
        AccountType::Asset => AccountClass::Asset,
        AccountType::Liability => AccountClass::Liability,
        AccountType::Equity => AccountClass::Equity,
        AccountType::Revenue => AccountClass::Income,
        AccountType::Expense => AccountClass::Expense,
    }
}

async fn clear_processed_events(
    pool: &PgPool,
    tenant_id: Uuid,
    tenant_id_str: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM processed_events
        WHERE tenant_id = $1
          AND event_id IN (
              SELECT id FROM journal_entries
              WHERE tenant_id = $2 AND posted_at::date BETWEEN $3 AND $4
          )
        "#,
    )
    .bind(tenant_id)
    .bind(tenant_id_str)
    .bind(from)
    .bind(to)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn fetch_ledger_lines(
    pool: &PgPool,
    tenant_id_str: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<LedgerLine>, sqlx::Error> {
    sqlx::query_as::<_, LedgerLine>(
        r#"
        SELECT
            je.id AS entry_id,
            je.posted_at,
            a.id AS account_id,
            a.type,
            jl.debit_minor,
            jl.credit_minor
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        INNER JOIN accounts a ON a.tenant_id = je.tenant_id AND a.code = jl.account_ref
        WHERE je.tenant_id = $1 AND je.posted_at::date BETWEEN $2 AND $3
        ORDER BY je.posted_at ASC, je.id, jl.line_no ASC
        "#,
    )
    .bind(tenant_id_str)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Groups ledger lines by journal entry, preserving the query's posted_at order.
fn group_by_entry(rows: Vec<LedgerLine>) -> Vec<(Uuid, NaiveDate, Vec<ProjectionLine>)> {
    let mut entries: Vec<(Uuid, NaiveDate, Vec<ProjectionLine>)> = Vec::new();
    for row in rows {
        let day = NaiveDate::from_ymd_opt(row.posted_at.year(), row.posted_at.month(), row.posted_at.day())
            .expect("posted_at always carries a valid calendar date");
        let line = ProjectionLine {
            account_id: row.account_id,
            account_class: to_account_class(row.account_type),
            debit: money::Money::from_minor_units(row.debit_minor).inner(),
            credit: money::Money::from_minor_units(row.credit_minor).inner(),
        };
        match entries.last_mut() {
            Some((id, _, lines)) if *id == row.entry_id => lines.push(line),
            _ => entries.push((row.entry_id, day, vec![line])),
        }
    }
    entries
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    if args.from > args.to {
        eprintln!("--from must not be after --to");
        std::process::exit(1);
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await
        .expect("failed to connect to database");

    let tenant_id_str = args.tenant_id.to_string();

    tracing::info!(tenant_id = %args.tenant_id, from = %args.from, to = %args.to, "starting projection rebuild");

    let cleared = clear_processed_events(&pool, args.tenant_id, &tenant_id_str, args.from, args.to)
        .await
        .expect("failed to clear processed_events for range");
    tracing::info!(cleared, "cleared stale processed_events rows");

    projections::clear_range(&pool, args.tenant_id, args.from, args.to)
        .await
        .expect("failed to clear daily_account_balances/daily_summaries for range");
    tracing::info!("cleared existing projection rows for range");

    let rows = fetch_ledger_lines(&pool, &tenant_id_str, args.from, args.to)
        .await
        .expect("failed to fetch ledger lines for range");
    let entries = group_by_entry(rows);

    tracing::info!(entry_count = entries.len(), "replaying journal entries");

    let mut applied = 0usize;
    for (entry_id, day, lines) in entries {
        let mut tx = pool.begin().await.expect("failed to begin transaction");
        let newly_applied = projections::mark_processed_if_new(&mut tx, args.tenant_id, entry_id)
            .await
            .expect("failed to mark event processed");
        if newly_applied {
            projections::apply_journal_entry_created(&mut tx, args.tenant_id, day, &lines)
                .await
                .expect("failed to apply journal entry into projections");
            applied += 1;
        }
        tx.commit().await.expect("failed to commit transaction");
    }

    tracing::info!(applied, "projection rebuild complete");
}
