//! Balance Sheet (C13): running balance per account, as of a single date
//! `D`, summed from inception (no lower date bound) over
//! `daily_account_balances`. ASSET/EXPENSE accounts report `debit − credit`;
//! LIABILITY/EQUITY/INCOME report `credit − debit`, per spec §4.13.

use chrono::NaiveDate;
use gl_rs::repos::account_repo::{AccountType, NormalBalance};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BalanceSheetError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, FromRow)]
struct BalanceRow {
    account_id: Uuid,
    code: String,
    name: String,
    #[sqlx(rename = "type")]
    account_type: AccountType,
    normal_balance: NormalBalance,
    debit_total: Decimal,
    credit_total: Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BalanceSheetLine {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: Vec<BalanceSheetLine>,
    pub liabilities: Vec<BalanceSheetLine>,
    pub equity: Vec<BalanceSheetLine>,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
}

pub async fn balance_sheet(
    pool: &PgPool,
    tenant_id: Uuid,
    as_of: NaiveDate,
) -> Result<BalanceSheet, BalanceSheetError> {
    let tenant_id_str = tenant_id.to_string();

    let rows = sqlx::query_as::<_, BalanceRow>(
        r#"
        SELECT
            a.id AS account_id,
            a.code,
            a.name,
            a.type,
            a.normal_balance,
            COALESCE(SUM(dab.debit_total), 0) AS debit_total,
            COALESCE(SUM(dab.credit_total), 0) AS credit_total
        FROM accounts a
        LEFT JOIN daily_account_balances dab
            ON dab.account_id = a.id
           AND dab.tenant_id = $1
           AND dab.day <= $2
        WHERE a.tenant_id = $3
          AND a.type = ANY($4)
        GROUP BY a.id, a.code, a.name, a.type, a.normal_balance
        ORDER BY a.code
        "#,
    )
    .bind(tenant_id)
    .bind(as_of)
    .bind(&tenant_id_str)
    .bind([AccountType::Asset, AccountType::Liability, AccountType::Equity])
    .fetch_all(pool)
    .await?;

    let mut assets = Vec::new();
    let mut liabilities = Vec::new();
    let mut equity = Vec::new();
    let mut total_assets = Decimal::ZERO;
    let mut total_liabilities = Decimal::ZERO;
    let mut total_equity = Decimal::ZERO;

    for row in rows {
        let balance = match row.normal_balance {
            NormalBalance::Debit => row.debit_total - row.credit_total,
            NormalBalance::Credit => row.credit_total - row.debit_total,
        };
        let line = BalanceSheetLine {
            account_id: row.account_id,
            account_code: row.code,
            account_name: row.name,
            balance,
        };
        match row.account_type {
            AccountType::Asset => {
                total_assets += balance;
                assets.push(line);
            }
            AccountType::Liability => {
                total_liabilities += balance;
                liabilities.push(line);
            }
            AccountType::Equity => {
                total_equity += balance;
                equity.push(line);
            }
            _ => {}
        }
    }

    Ok(BalanceSheet {
        as_of,
        assets,
        liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
    })
}
