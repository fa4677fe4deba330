//! Account-transaction drilldown (C13): the opening balance is the running
//! total struck from `daily_account_balances` strictly before `from`, so
//! `opening_balance + sum(activity lines) == closing_balance` always holds
//! regardless of how far back the account's history goes. The line detail
//! itself is gl-rs's own read model (`report_query_repo`), reused rather
//! than re-queried here.

use chrono::{NaiveDate, TimeZone, Utc};
use gl_rs::repos::account_repo::{Account, AccountError, NormalBalance};
use gl_rs::repos::report_query_repo::{self, AccountActivityLine, ReportQueryError};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AccountActivityError {
    #[error("account error: {0}")]
    Account(#[from] AccountError),
    #[error("report query error: {0}")]
    Report(#[from] ReportQueryError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("account not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountActivityReport {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_count: i64,
    pub lines: Vec<AccountActivityLine>,
}

/// Cumulative balance from `daily_account_balances` strictly before `before`.
async fn balance_before(
    pool: &PgPool,
    tenant_id: Uuid,
    account_id: Uuid,
    normal_balance: NormalBalance,
    before: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    let (debit_total, credit_total): (Decimal, Decimal) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(debit_total), 0),
            COALESCE(SUM(credit_total), 0)
        FROM daily_account_balances
        WHERE tenant_id = $1 AND account_id = $2 AND day < $3
        "#,
    )
    .bind(tenant_id)
    .bind(account_id)
    .bind(before)
    .fetch_one(pool)
    .await?;

    Ok(match normal_balance {
        NormalBalance::Debit => debit_total - credit_total,
        NormalBalance::Credit => credit_total - debit_total,
    })
}

/// Cumulative balance from `daily_account_balances` through and including `through`.
async fn balance_through(
    pool: &PgPool,
    tenant_id: Uuid,
    account_id: Uuid,
    normal_balance: NormalBalance,
    through: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    let (debit_total, credit_total): (Decimal, Decimal) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(debit_total), 0),
            COALESCE(SUM(credit_total), 0)
        FROM daily_account_balances
        WHERE tenant_id = $1 AND account_id = $2 AND day <= $3
        "#,
    )
    .bind(tenant_id)
    .bind(account_id)
    .bind(through)
    .fetch_one(pool)
    .await?;

    Ok(match normal_balance {
        NormalBalance::Debit => debit_total - credit_total,
        NormalBalance::Credit => credit_total - debit_total,
    })
}

fn day_range_utc(from: NaiveDate, to: NaiveDate) -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&from.and_hms_opt(0, 0, 0).expect("valid midnight"));
    let end = Utc.from_utc_datetime(&to.and_hms_opt(23, 59, 59).expect("valid end of day"));
    (start, end)
}

pub async fn account_activity(
    pool: &PgPool,
    tenant_id: Uuid,
    account_code: &str,
    from: NaiveDate,
    to: NaiveDate,
    limit: i64,
    offset: i64,
) -> Result<AccountActivityReport, AccountActivityError> {
    let tenant_id_str = tenant_id.to_string();
    let account: Account = gl_rs::repos::account_repo::find_by_code(pool, &tenant_id_str, account_code)
        .await?
        .ok_or_else(|| AccountActivityError::NotFound(account_code.to_string()))?;

    let opening = balance_before(pool, tenant_id, account.id, account.normal_balance, from).await?;
    let closing = balance_through(pool, tenant_id, account.id, account.normal_balance, to).await?;

    let (start, end) = day_range_utc(from, to);
    let lines = report_query_repo::query_account_activity(
        pool,
        &tenant_id_str,
        account_code,
        start,
        end,
        limit,
        offset,
    )
    .await?;
    let total_count =
        report_query_repo::count_account_activity(pool, &tenant_id_str, account_code, start, end).await?;

    Ok(AccountActivityReport {
        account_id: account.id,
        account_code: account.code,
        account_name: account.name,
        from,
        to,
        opening_balance: opening,
        closing_balance: closing,
        total_count,
        lines,
    })
}
