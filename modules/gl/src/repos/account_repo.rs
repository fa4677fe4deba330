use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Account type enum matching database account_type
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Normal balance enum matching database normal_balance
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(type_name = "normal_balance", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalBalance {
    Debit,
    Credit,
}

/// Account model representing a Chart of Accounts entry
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub account_type: AccountType,
    pub normal_balance: NormalBalance,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during account repository operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found: tenant_id={tenant_id}, code={code}")]
    NotFound { tenant_id: String, code: String },

    #[error("Account is inactive: tenant_id={tenant_id}, code={code}")]
    Inactive { tenant_id: String, code: String },

    #[error("Account code already exists: tenant_id={tenant_id}, code={code}")]
    DuplicateCode { tenant_id: String, code: String },

    #[error("Account has journal lines referencing it and cannot be deleted: {code}")]
    HasReferences { code: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AccountType {
    /// ASSET/EXPENSE accounts carry a debit normal balance; the rest carry
    /// credit, per C3. Stored explicitly on the row rather than derived at
    /// read time so reporting doesn't need to re-derive it per query.
    pub fn normal_balance(&self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }
}

/// Creates an account, enforcing `(tenant_id, code)` uniqueness and deriving
/// `normal_balance` from `account_type` rather than trusting a caller-
/// supplied value.
pub async fn insert_account(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
    name: &str,
    account_type: AccountType,
) -> Result<Account, AccountError> {
    if find_by_code(pool, tenant_id, code).await?.is_some() {
        return Err(AccountError::DuplicateCode {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        });
    }
    let id = Uuid::new_v4();
    let normal_balance = account_type.normal_balance();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, tenant_id, code, name, type, normal_balance, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, true, now())
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(code)
    .bind(name)
    .bind(&account_type)
    .bind(&normal_balance)
    .execute(pool)
    .await?;

    find_by_code(pool, tenant_id, code)
        .await?
        .ok_or_else(|| AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        })
}

/// Idempotently ensures a system account (AR, AP, Sales Income, Cash, Tax
/// Payable, Inventory Asset, COGS) exists for `tenant_id`, returning the
/// existing row if already provisioned. Per C3, these are auto-provisioned
/// on demand rather than requiring an explicit setup step.
pub async fn ensure_system_account(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
    name: &str,
    account_type: AccountType,
) -> Result<Account, AccountError> {
    if let Some(existing) = find_by_code(pool, tenant_id, code).await? {
        return Ok(existing);
    }
    match insert_account(pool, tenant_id, code, name, account_type).await {
        Ok(account) => Ok(account),
        Err(AccountError::DuplicateCode { .. }) => {
            // Lost a race with a concurrent provisioner; the row now exists.
            find_active_by_code(pool, tenant_id, code).await
        }
        Err(e) => Err(e),
    }
}

/// Deactivates an account in place of deletion. C3 disallows hard deletion
/// once any journal line references the account; callers that need to
/// retire an account call this instead.
pub async fn deactivate(pool: &PgPool, tenant_id: &str, code: &str) -> Result<(), AccountError> {
    find_active_by_code(pool, tenant_id, code).await?;
    sqlx::query("UPDATE accounts SET is_active = false WHERE tenant_id = $1 AND code = $2")
        .bind(tenant_id)
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_accounts(pool: &PgPool, tenant_id: &str) -> Result<Vec<Account>, AccountError> {
    let accounts = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1
        ORDER BY code
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(accounts)
}

/// Find an account by tenant_id and code
/// Returns None if account doesn't exist
pub async fn find_by_code(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1 AND code = $2
        "#,
    )
    .bind(tenant_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// Find an account by tenant_id and code within a transaction
pub async fn find_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1 AND code = $2
        "#,
    )
    .bind(tenant_id)
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(account)
}

/// Find an active account by tenant_id and code
/// Returns error if account doesn't exist or is inactive
pub async fn find_active_by_code(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    let account = find_by_code(pool, tenant_id, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
    }
}

/// Find an active account by tenant_id and code within a transaction
/// Returns error if account doesn't exist or is inactive
pub async fn find_active_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    let account = find_by_code_tx(tx, tenant_id, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
    }
}

/// Assert that an account exists and is active
/// This is a convenience function for validation
pub async fn assert_active(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<(), AccountError> {
    find_active_by_code(pool, tenant_id, code).await?;
    Ok(())
}

/// Assert that an account exists and is active within a transaction
pub async fn assert_active_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<(), AccountError> {
    find_active_by_code_tx(tx, tenant_id, code).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that AccountType enum matches database enum values
    #[test]
    fn test_account_type_variants() {
        // These should match the database enum values
        let types = vec![
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ];
        assert_eq!(types.len(), 5);
    }

    /// Test that NormalBalance enum matches database enum values
    #[test]
    fn test_normal_balance_variants() {
        // These should match the database enum values
        let balances = vec![NormalBalance::Debit, NormalBalance::Credit];
        assert_eq!(balances.len(), 2);
    }
}
