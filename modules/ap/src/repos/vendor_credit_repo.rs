use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VendorCredit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub amount_applied: Decimal,
    pub expense_account_code: String,
    pub tax_amount: Decimal,
    pub journal_entry_id: Uuid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VendorCreditApplication {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_credit_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum VendorCreditError {
    #[error("vendor credit not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewVendorCredit {
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub expense_account_code: String,
    pub tax_amount: Decimal,
    pub journal_entry_id: Uuid,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: NewVendorCredit,
) -> Result<VendorCredit, VendorCreditError> {
    let credit = sqlx::query_as::<_, VendorCredit>(
        r#"
        INSERT INTO vendor_credits
            (id, tenant_id, vendor_id, credit_date, currency, amount, amount_applied,
             expense_account_code, tax_amount, journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, now())
        RETURNING id, tenant_id, vendor_id, credit_date, currency, amount, amount_applied,
                  expense_account_code, tax_amount, journal_entry_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.tenant_id)
    .bind(new.vendor_id)
    .bind(new.credit_date)
    .bind(&new.currency)
    .bind(new.amount)
    .bind(&new.expense_account_code)
    .bind(new.tax_amount)
    .bind(new.journal_entry_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(credit)
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<VendorCredit, VendorCreditError> {
    sqlx::query_as::<_, VendorCredit>(
        "SELECT id, tenant_id, vendor_id, credit_date, currency, amount, amount_applied,
                expense_account_code, tax_amount, journal_entry_id
         FROM vendor_credits WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(VendorCreditError::NotFound { tenant_id, id })
}

pub async fn lock_by_id(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<VendorCredit, VendorCreditError> {
    sqlx::query_as::<_, VendorCredit>(
        "SELECT id, tenant_id, vendor_id, credit_date, currency, amount, amount_applied,
                expense_account_code, tax_amount, journal_entry_id
         FROM vendor_credits WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(VendorCreditError::NotFound { tenant_id, id })
}

pub async fn add_application_amount(
    tx: &mut Transaction<'_, Postgres>,
    vendor_credit_id: Uuid,
    amount: Decimal,
) -> Result<(), VendorCreditError> {
    sqlx::query("UPDATE vendor_credits SET amount_applied = amount_applied + $2 WHERE id = $1")
        .bind(vendor_credit_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_application(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    vendor_credit_id: Uuid,
    bill_id: Uuid,
    amount: Decimal,
) -> Result<VendorCreditApplication, VendorCreditError> {
    let app = sqlx::query_as::<_, VendorCreditApplication>(
        r#"
        INSERT INTO vendor_credit_applications (id, tenant_id, vendor_credit_id, bill_id, amount, applied_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING id, tenant_id, vendor_credit_id, bill_id, amount
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(vendor_credit_id)
    .bind(bill_id)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;
    Ok(app)
}
