use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomerAdvance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub received_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub amount_applied: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomerAdvanceApplication {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_advance_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum CustomerAdvanceError {
    #[error("customer advance not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewCustomerAdvance {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub received_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: NewCustomerAdvance,
) -> Result<CustomerAdvance, CustomerAdvanceError> {
    let advance = sqlx::query_as::<_, CustomerAdvance>(
        r#"
        INSERT INTO customer_advances
            (id, tenant_id, customer_id, received_date, currency, amount, amount_applied,
             bank_account_code, journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, now())
        RETURNING id, tenant_id, customer_id, received_date, currency, amount, amount_applied,
                  bank_account_code, journal_entry_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.tenant_id)
    .bind(new.customer_id)
    .bind(new.received_date)
    .bind(&new.currency)
    .bind(new.amount)
    .bind(&new.bank_account_code)
    .bind(new.journal_entry_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(advance)
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<CustomerAdvance, CustomerAdvanceError> {
    sqlx::query_as::<_, CustomerAdvance>(
        "SELECT id, tenant_id, customer_id, received_date, currency, amount, amount_applied,
                bank_account_code, journal_entry_id
         FROM customer_advances WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(CustomerAdvanceError::NotFound { tenant_id, id })
}

pub async fn lock_by_id(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<CustomerAdvance, CustomerAdvanceError> {
    sqlx::query_as::<_, CustomerAdvance>(
        "SELECT id, tenant_id, customer_id, received_date, currency, amount, amount_applied,
                bank_account_code, journal_entry_id
         FROM customer_advances WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(CustomerAdvanceError::NotFound { tenant_id, id })
}

pub async fn add_application_amount(
    tx: &mut Transaction<'_, Postgres>,
    advance_id: Uuid,
    amount: Decimal,
) -> Result<(), CustomerAdvanceError> {
    sqlx::query("UPDATE customer_advances SET amount_applied = amount_applied + $2 WHERE id = $1")
        .bind(advance_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_application(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    advance_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
) -> Result<CustomerAdvanceApplication, CustomerAdvanceError> {
    let app = sqlx::query_as::<_, CustomerAdvanceApplication>(
        r#"
        INSERT INTO customer_advance_applications
            (id, tenant_id, customer_advance_id, invoice_id, amount, applied_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING id, tenant_id, customer_advance_id, invoice_id, amount
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(advance_id)
    .bind(invoice_id)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;
    Ok(app)
}
