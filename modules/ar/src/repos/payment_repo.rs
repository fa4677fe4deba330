use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
    pub reversed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub reversal_journal_entry_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("payment {id} was already reversed")]
    AlreadyReversed { id: Uuid },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
}

pub async fn insert(tx: &mut Transaction<'_, Postgres>, new: NewPayment) -> Result<Payment, PaymentError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO ar_payments
            (id, tenant_id, invoice_id, payment_date, amount, bank_account_code,
             journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING id, tenant_id, invoice_id, payment_date, amount, bank_account_code,
                  journal_entry_id, reversed_at, reversal_journal_entry_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.tenant_id)
    .bind(new.invoice_id)
    .bind(new.payment_date)
    .bind(new.amount)
    .bind(&new.bank_account_code)
    .bind(new.journal_entry_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(payment)
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Payment, PaymentError> {
    sqlx::query_as::<_, Payment>(
        "SELECT id, tenant_id, invoice_id, payment_date, amount, bank_account_code,
                journal_entry_id, reversed_at, reversal_journal_entry_id
         FROM ar_payments WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(PaymentError::NotFound { tenant_id, id })
}

pub async fn list_for_invoice(
    pool: impl sqlx::PgExecutor<'_>,
    invoice_id: Uuid,
) -> Result<Vec<Payment>, PaymentError> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT id, tenant_id, invoice_id, payment_date, amount, bank_account_code,
                journal_entry_id, reversed_at, reversal_journal_entry_id
         FROM ar_payments WHERE invoice_id = $1 ORDER BY payment_date, created_at",
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}

/// Sum of non-reversed payments against an invoice, recomputed rather than
/// trusted from `invoices.amount_paid` wherever a caller needs a value that
/// can't drift from the `ar_payments` rows it's derived from.
pub async fn sum_active_for_invoice(
    pool: impl sqlx::PgExecutor<'_>,
    invoice_id: Uuid,
) -> Result<Decimal, PaymentError> {
    let sum: Option<Decimal> = sqlx::query_scalar(
        "SELECT SUM(amount) FROM ar_payments WHERE invoice_id = $1 AND reversed_at IS NULL",
    )
    .bind(invoice_id)
    .fetch_one(pool)
    .await?;
    Ok(sum.unwrap_or_default())
}

pub async fn mark_reversed(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    reversal_journal_entry_id: Uuid,
) -> Result<(), PaymentError> {
    sqlx::query(
        "UPDATE ar_payments SET reversed_at = now(), reversal_journal_entry_id = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(reversal_journal_entry_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
