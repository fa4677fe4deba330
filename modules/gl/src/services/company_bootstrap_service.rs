//! Bootstraps a new tenant with its default chart of accounts
//! (`POST /companies`, spec §6).
//!
//! The system accounts this seeds are the ones C3 says are auto-provisioned
//! on demand: AR, AP, Sales Income, Cash, Tax Payable, Tax Receivable,
//! Inventory Asset, COGS, and the customer/vendor advance accounts. Their
//! codes are fixed so every other module can reference them by constant
//! instead of looking them up per request.

use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::account_repo::{self, Account, AccountError, AccountType};

pub const AR_CODE: &str = "1100";
pub const CASH_CODE: &str = "1000";
pub const INVENTORY_ASSET_CODE: &str = "1200";
pub const AP_CODE: &str = "2000";
pub const TAX_PAYABLE_CODE: &str = "2100";
pub const CUSTOMER_ADVANCE_LIABILITY_CODE: &str = "2200";
pub const VENDOR_ADVANCE_ASSET_CODE: &str = "1300";
pub const TAX_RECEIVABLE_CODE: &str = "1400";
pub const SALES_INCOME_CODE: &str = "4000";
pub const COGS_CODE: &str = "5000";

#[derive(Debug, Clone)]
pub struct CompanyAccounts {
    pub ar: Account,
    pub ap: Account,
    pub cash: Account,
    pub sales_income: Account,
    pub tax_payable: Account,
    pub tax_receivable: Account,
    pub inventory_asset: Account,
    pub cogs: Account,
    pub customer_advance_liability: Account,
    pub vendor_advance_asset: Account,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Tenant(#[from] tenant_registry::TenantError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Creates the tenant row and seeds its default chart of accounts. Safe to
/// call more than once for the same `tenant_id`: account provisioning is
/// idempotent via [`account_repo::ensure_system_account`], though the tenant
/// row itself is only ever inserted once (a second call with a fresh
/// `tenant_id` always creates a new tenant).
pub async fn bootstrap_company(
    pool: &PgPool,
    tenant_id: Uuid,
    name: &str,
    default_currency: &str,
) -> Result<CompanyAccounts, BootstrapError> {
    sqlx::query(
        "INSERT INTO tenants (id, name, default_currency, closed_through_date)
         VALUES ($1, $2, $3, NULL)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(tenant_id)
    .bind(name)
    .bind(default_currency)
    .execute(pool)
    .await
    .map_err(tenant_registry::TenantError::Database)?;

    ensure_default_accounts(pool, &tenant_id.to_string()).await
}

/// Ensures the default chart of accounts for a tenant that already exists
/// (used by callers, e.g. C9's POS import, that only ever see a tenant id
/// string and never mint a tenant row themselves).
pub async fn ensure_default_accounts(
    pool: &PgPool,
    tenant_id: &str,
) -> Result<CompanyAccounts, BootstrapError> {
    let ar = account_repo::ensure_system_account(pool, tenant_id, AR_CODE, "Accounts Receivable", AccountType::Asset).await?;
    let ap = account_repo::ensure_system_account(pool, tenant_id, AP_CODE, "Accounts Payable", AccountType::Liability).await?;
    let cash = account_repo::ensure_system_account(pool, tenant_id, CASH_CODE, "Cash", AccountType::Asset).await?;
    let sales_income = account_repo::ensure_system_account(pool, tenant_id, SALES_INCOME_CODE, "Sales Income", AccountType::Revenue).await?;
    let tax_payable = account_repo::ensure_system_account(pool, tenant_id, TAX_PAYABLE_CODE, "Tax Payable", AccountType::Liability).await?;
    let tax_receivable = account_repo::ensure_system_account(pool, tenant_id, TAX_RECEIVABLE_CODE, "Tax Receivable", AccountType::Asset).await?;
    let inventory_asset = account_repo::ensure_system_account(pool, tenant_id, INVENTORY_ASSET_CODE, "Inventory Asset", AccountType::Asset).await?;
    let cogs = account_repo::ensure_system_account(pool, tenant_id, COGS_CODE, "Cost of Goods Sold", AccountType::Expense).await?;
    let customer_advance_liability = account_repo::ensure_system_account(pool, tenant_id, CUSTOMER_ADVANCE_LIABILITY_CODE, "Customer Advances", AccountType::Liability).await?;
    let vendor_advance_asset = account_repo::ensure_system_account(pool, tenant_id, VENDOR_ADVANCE_ASSET_CODE, "Vendor Advances", AccountType::Asset).await?;

    Ok(CompanyAccounts {
        ar,
        ap,
        cash,
        sales_income,
        tax_payable,
        tax_receivable,
        inventory_asset,
        cogs,
        customer_advance_liability,
        vendor_advance_asset,
    })
}
