//! Profit & Loss (C13): sums `daily_account_balances` over `[from, to]` by
//! INCOME/EXPENSE account, netted per account per the normal-balance sign
//! convention `gl_rs::repos::account_repo::AccountType::normal_balance`
//! already encodes.

use chrono::NaiveDate;
use gl_rs::repos::account_repo::{AccountType, NormalBalance};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PlReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, FromRow)]
struct PlRow {
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
pub struct PlLine {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub net: Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income_lines: Vec<PlLine>,
    pub expense_lines: Vec<PlLine>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_income: Decimal,
}

pub async fn profit_and_loss(
    pool: &PgPool,
    tenant_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<ProfitAndLoss, PlReportError> {
    let tenant_id_str = tenant_id.to_string();

    let rows = sqlx::query_as::<_, PlRow>(
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
           AND dab.day BETWEEN $2 AND $3
        WHERE a.tenant_id = $4
          AND a.type = ANY($5)
        GROUP BY a.id, a.code, a.name, a.type, a.normal_balance
        ORDER BY a.code
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .bind(&tenant_id_str)
    .bind([AccountType::Revenue, AccountType::Expense])
    .fetch_all(pool)
    .await?;

    let mut income_lines = Vec::new();
    let mut expense_lines = Vec::new();
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;

    for row in rows {
        let net = match row.normal_balance {
            NormalBalance::Credit => row.credit_total - row.debit_total,
            NormalBalance::Debit => row.debit_total - row.credit_total,
        };
        let line = PlLine {
            account_id: row.account_id,
            account_code: row.code,
            account_name: row.name,
            net,
        };
        match row.account_type {
            AccountType::Revenue => {
                total_income += net;
                income_lines.push(line);
            }
            AccountType::Expense => {
                total_expense += net;
                expense_lines.push(line);
            }
            _ => {}
        }
    }

    Ok(ProfitAndLoss {
        from,
        to,
        net_income: total_income - total_expense,
        income_lines,
        expense_lines,
        total_income,
        total_expense,
    })
}
