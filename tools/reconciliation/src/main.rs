//! Nightly invariant reconciliation runner — no mocks, reads the live
//! database directly and reports every violation of T1/T4/T5/T6/T9 it finds
//! (spec §8). This is an audit tool: it never writes, and a violation is
//! always reported rather than silently corrected, matching the ledger's own
//! INTEGRITY error policy (fail closed, log, never auto-correct).

use ap_rs::repos::bill_repo::{self, BillStatus};
use ar_rs::repos::invoice_repo::{self, InvoiceStatus};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "reconciliation", about = "Check ledger invariants T1/T4/T5/T6/T9 across tenants")]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Restrict the run to a single tenant; defaults to every row in `tenants`.
    #[arg(long)]
    tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct Violation {
    check: &'static str,
    tenant_id: Uuid,
    entity_id: String,
    detail: String,
}

async fn fetch_tenants(pool: &PgPool, only: Option<Uuid>) -> Result<Vec<Uuid>, sqlx::Error> {
    match only {
        Some(id) => Ok(vec![id]),
        None => sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants ORDER BY created_at")
            .fetch_all(pool)
            .await,
    }
}

/// T1 — every committed journal entry's lines sum to equal, positive debits and credits.
async fn check_balanced_journals(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let tenant_id_str = tenant_id.to_string();
    let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
        r#"
        SELECT je.id, SUM(jl.debit_minor), SUM(jl.credit_minor)
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        WHERE je.tenant_id = $1
        GROUP BY je.id
        HAVING SUM(jl.debit_minor) != SUM(jl.credit_minor) OR SUM(jl.debit_minor) <= 0
        "#,
    )
    .bind(&tenant_id_str)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(entry_id, debit, credit)| Violation {
            check: "T1_balanced_journals",
            tenant_id,
            entity_id: entry_id.to_string(),
            detail: format!("debit_minor={debit} credit_minor={credit}"),
        })
        .collect())
}

/// T9 — no journal entry exists on or before the tenant's closed-through date.
async fn check_period_close(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let tenant_id_str = tenant_id.to_string();
    let rows: Vec<(Uuid, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT je.id, je.posted_at::date
        FROM journal_entries je
        INNER JOIN tenants t ON t.id = $2
        WHERE je.tenant_id = $1
          AND t.closed_through_date IS NOT NULL
          AND je.posted_at::date <= t.closed_through_date
        "#,
    )
    .bind(&tenant_id_str)
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(entry_id, posted_date)| Violation {
            check: "T9_period_close",
            tenant_id,
            entity_id: entry_id.to_string(),
            detail: format!("posted_at={posted_date} is on or before the tenant's closed_through_date"),
        })
        .collect())
}

/// T4 — every non-DRAFT, non-VOID invoice's status is exactly the §4.6 function of amountPaid/total.
fn expected_invoice_status(amount_paid: Decimal, total: Decimal) -> InvoiceStatus {
    if amount_paid <= Decimal::ZERO {
        InvoiceStatus::Posted
    } else if amount_paid < total {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Paid
    }
}

async fn check_invoice_status_law(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let invoices = invoice_repo::list(pool, tenant_id).await.map_err(to_sqlx_err)?;
    Ok(invoices
        .into_iter()
        .filter(|inv| !matches!(inv.status, InvoiceStatus::Draft | InvoiceStatus::Void))
        .filter_map(|inv| {
            let expected = expected_invoice_status(inv.amount_paid, inv.total);
            (expected != inv.status).then(|| Violation {
                check: "T4_invoice_status_law",
                tenant_id,
                entity_id: inv.id.to_string(),
                detail: format!(
                    "status={:?} amountPaid={} total={} expected={:?}",
                    inv.status, inv.amount_paid, inv.total, expected
                ),
            })
        })
        .collect())
}

/// T4's bill-side mirror — spec.md defines the law only for invoices, but
/// `ap`'s status derivation follows the identical function (DESIGN.md), so
/// the same check applies.
fn expected_bill_status(amount_paid: Decimal, total: Decimal) -> BillStatus {
    if amount_paid <= Decimal::ZERO {
        BillStatus::Posted
    } else if amount_paid < total {
        BillStatus::Partial
    } else {
        BillStatus::Paid
    }
}

async fn check_bill_status_law(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let bills = bill_repo::list(pool, tenant_id).await.map_err(to_sqlx_err)?;
    Ok(bills
        .into_iter()
        .filter(|bill| !matches!(bill.status, BillStatus::Draft | BillStatus::Void))
        .filter_map(|bill| {
            let expected = expected_bill_status(bill.amount_paid, bill.total);
            (expected != bill.status).then(|| Violation {
                check: "T4_bill_status_law",
                tenant_id,
                entity_id: bill.id.to_string(),
                detail: format!(
                    "status={:?} amountPaid={} total={} expected={:?}",
                    bill.status, bill.amount_paid, bill.total, expected
                ),
            })
        })
        .collect())
}

/// T5 — invoice.amountPaid == Σ non-reversed payments + Σ applied credit notes + Σ applied advances.
async fn check_invoice_payment_conservation(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let invoices = invoice_repo::list(pool, tenant_id).await.map_err(to_sqlx_err)?;
    let mut violations = Vec::new();
    for inv in invoices {
        let recomputed = invoice_repo::recompute_amount_paid(pool, inv.id)
            .await
            .map_err(to_sqlx_err)?;
        if recomputed != inv.amount_paid {
            violations.push(Violation {
                check: "T5_invoice_payment_conservation",
                tenant_id,
                entity_id: inv.id.to_string(),
                detail: format!("stored amountPaid={} recomputed={}", inv.amount_paid, recomputed),
            });
        }
    }
    Ok(violations)
}

async fn check_bill_payment_conservation(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let bills = bill_repo::list(pool, tenant_id).await.map_err(to_sqlx_err)?;
    let mut violations = Vec::new();
    for bill in bills {
        let recomputed = bill_repo::recompute_amount_paid(pool, bill.id)
            .await
            .map_err(to_sqlx_err)?;
        if recomputed != bill.amount_paid {
            violations.push(Violation {
                check: "T5_bill_payment_conservation",
                tenant_id,
                entity_id: bill.id.to_string(),
                detail: format!("stored amountPaid={} recomputed={}", bill.amount_paid, recomputed),
            });
        }
    }
    Ok(violations)
}

/// T6 — `daily_account_balances` rebuilt from the ledger equals its live values.
async fn check_projection_equivalence(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Violation>, sqlx::Error> {
    let tenant_id_str = tenant_id.to_string();

    let ledger_rows: Vec<(Uuid, NaiveDate, i64, i64)> = sqlx::query_as(
        r#"
        SELECT a.id, je.posted_at::date, SUM(jl.debit_minor), SUM(jl.credit_minor)
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        INNER JOIN accounts a ON a.tenant_id = je.tenant_id AND a.code = jl.account_ref
        WHERE je.tenant_id = $1
        GROUP BY a.id, je.posted_at::date
        "#,
    )
    .bind(&tenant_id_str)
    .fetch_all(pool)
    .await?;

    let mut recomputed: HashMap<(Uuid, NaiveDate), (Decimal, Decimal)> = HashMap::new();
    for (account_id, day, debit_minor, credit_minor) in ledger_rows {
        recomputed.insert(
            (account_id, day),
            (
                money::Money::from_minor_units(debit_minor).inner(),
                money::Money::from_minor_units(credit_minor).inner(),
            ),
        );
    }

    let live_rows: Vec<(Uuid, NaiveDate, Decimal, Decimal)> = sqlx::query_as(
        r#"
        SELECT account_id, day, debit_total, credit_total
        FROM daily_account_balances
        WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    let mut violations = Vec::new();
    let mut seen: HashMap<(Uuid, NaiveDate), (Decimal, Decimal)> = HashMap::new();
    for (account_id, day, debit_total, credit_total) in live_rows {
        seen.insert((account_id, day), (debit_total, credit_total));
        match recomputed.get(&(account_id, day)) {
            Some((expected_debit, expected_credit))
                if *expected_debit == debit_total && *expected_credit == credit_total => {}
            Some((expected_debit, expected_credit)) => violations.push(Violation {
                check: "T6_projection_equivalence",
                tenant_id,
                entity_id: format!("{account_id}/{day}"),
                detail: format!(
                    "live debit={debit_total} credit={credit_total} ledger debit={expected_debit} credit={expected_credit}"
                ),
            }),
            None => violations.push(Violation {
                check: "T6_projection_equivalence",
                tenant_id,
                entity_id: format!("{account_id}/{day}"),
                detail: "projection row has no corresponding ledger activity".to_string(),
            }),
        }
    }
    for (key, (expected_debit, expected_credit)) in recomputed {
        if !seen.contains_key(&key) {
            violations.push(Violation {
                check: "T6_projection_equivalence",
                tenant_id,
                entity_id: format!("{}/{}", key.0, key.1),
                detail: format!(
                    "ledger activity debit={expected_debit} credit={expected_credit} missing from daily_account_balances"
                ),
            });
        }
    }
    Ok(violations)
}

fn to_sqlx_err<E: std::fmt::Display>(err: E) -> sqlx::Error {
    sqlx::Error::Protocol(err.to_string())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await
        .expect("failed to connect to database");

    let tenants = fetch_tenants(&pool, args.tenant_id)
        .await
        .expect("failed to list tenants");

    tracing::info!(tenant_count = tenants.len(), "starting reconciliation run");

    let mut all_violations = Vec::new();
    for tenant_id in tenants {
        for result in [
            check_balanced_journals(&pool, tenant_id).await,
            check_period_close(&pool, tenant_id).await,
            check_invoice_status_law(&pool, tenant_id).await,
            check_bill_status_law(&pool, tenant_id).await,
            check_invoice_payment_conservation(&pool, tenant_id).await,
            check_bill_payment_conservation(&pool, tenant_id).await,
            check_projection_equivalence(&pool, tenant_id).await,
        ] {
            match result {
                Ok(mut violations) => all_violations.append(&mut violations),
                Err(e) => tracing::error!(tenant_id = %tenant_id, error = %e, "reconciliation check failed to run"),
            }
        }
    }

    if all_violations.is_empty() {
        tracing::info!("reconciliation run clean — no invariant violations found");
        return;
    }

    tracing::error!(count = all_violations.len(), "invariant violations found");
    for violation in &all_violations {
        println!("{}", serde_json::to_string(violation).expect("Violation always serializes"));
    }
    std::process::exit(1);
}
