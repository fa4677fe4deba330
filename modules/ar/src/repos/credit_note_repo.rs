use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub amount_applied: Decimal,
    pub income_account_code: String,
    pub tax_amount: Decimal,
    pub journal_entry_id: Uuid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CreditNoteApplication {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub credit_note_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum CreditNoteError {
    #[error("credit note not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewCreditNote {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub income_account_code: String,
    pub tax_amount: Decimal,
    pub journal_entry_id: Uuid,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: NewCreditNote,
) -> Result<CreditNote, CreditNoteError> {
    let credit_note = sqlx::query_as::<_, CreditNote>(
        r#"
        INSERT INTO credit_notes
            (id, tenant_id, customer_id, credit_date, currency, amount, amount_applied,
             income_account_code, tax_amount, journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, now())
        RETURNING id, tenant_id, customer_id, credit_date, currency, amount, amount_applied,
                  income_account_code, tax_amount, journal_entry_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.tenant_id)
    .bind(new.customer_id)
    .bind(new.credit_date)
    .bind(&new.currency)
    .bind(new.amount)
    .bind(&new.income_account_code)
    .bind(new.tax_amount)
    .bind(new.journal_entry_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(credit_note)
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<CreditNote, CreditNoteError> {
    sqlx::query_as::<_, CreditNote>(
        "SELECT id, tenant_id, customer_id, credit_date, currency, amount, amount_applied,
                income_account_code, tax_amount, journal_entry_id
         FROM credit_notes WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(CreditNoteError::NotFound { tenant_id, id })
}

pub async fn lock_by_id(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<CreditNote, CreditNoteError> {
    sqlx::query_as::<_, CreditNote>(
        "SELECT id, tenant_id, customer_id, credit_date, currency, amount, amount_applied,
                income_account_code, tax_amount, journal_entry_id
         FROM credit_notes WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(CreditNoteError::NotFound { tenant_id, id })
}

pub async fn add_application_amount(
    tx: &mut Transaction<'_, Postgres>,
    credit_note_id: Uuid,
    amount: Decimal,
) -> Result<(), CreditNoteError> {
    sqlx::query("UPDATE credit_notes SET amount_applied = amount_applied + $2 WHERE id = $1")
        .bind(credit_note_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_application(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    credit_note_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
) -> Result<CreditNoteApplication, CreditNoteError> {
    let app = sqlx::query_as::<_, CreditNoteApplication>(
        r#"
        INSERT INTO credit_note_applications (id, tenant_id, credit_note_id, invoice_id, amount, applied_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING id, tenant_id, credit_note_id, invoice_id, amount
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(credit_note_id)
    .bind(invoice_id)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;
    Ok(app)
}
