//! C3: Chart of Accounts creation, deactivation, and listing.
//!
//! Account codes are arbitrary short tenant-chosen identifiers
//! (`account_ref` in the posting contract); this service is the only path
//! by which an account comes to exist, so `(tenant_id, code)` uniqueness and
//! the type-to-normal-balance mapping are enforced in one place.

use sqlx::PgPool;

use crate::repos::account_repo::{self, Account, AccountError, AccountType};

#[derive(Debug, thiserror::Error)]
pub enum ChartOfAccountsError {
    #[error("account code must not be empty")]
    EmptyCode,
    #[error("account name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Account(#[from] AccountError),
}

pub struct CreateAccountRequest {
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
}

pub async fn create_account(
    pool: &PgPool,
    req: CreateAccountRequest,
) -> Result<Account, ChartOfAccountsError> {
    if req.code.trim().is_empty() {
        return Err(ChartOfAccountsError::EmptyCode);
    }
    if req.name.trim().is_empty() {
        return Err(ChartOfAccountsError::EmptyName);
    }
    let account = account_repo::insert_account(
        pool,
        &req.tenant_id,
        &req.code,
        &req.name,
        req.account_type,
    )
    .await?;
    Ok(account)
}

pub async fn deactivate_account(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<(), ChartOfAccountsError> {
    account_repo::deactivate(pool, tenant_id, code).await?;
    Ok(())
}

pub async fn list_accounts(
    pool: &PgPool,
    tenant_id: &str,
) -> Result<Vec<Account>, ChartOfAccountsError> {
    Ok(account_repo::list_accounts(pool, tenant_id).await?)
}
