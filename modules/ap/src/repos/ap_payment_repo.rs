use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApPayment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub bill_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
    pub reversed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub reversal_journal_entry_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum ApPaymentError {
    #[error("payment not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("payment {id} was already reversed")]
    AlreadyReversed { id: Uuid },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewApPayment {
    pub tenant_id: Uuid,
    pub bill_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub journal_entry_id: Uuid,
}

pub async fn insert(tx: &mut Transaction<'_, Postgres>, new: NewApPayment) -> Result<ApPayment, ApPaymentError> {
    let payment = sqlx::query_as::<_, ApPayment>(
        r#"
        INSERT INTO ap_payments
            (id, tenant_id, bill_id, payment_date, amount, bank_account_code,
             journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING id, tenant_id, bill_id, payment_date, amount, bank_account_code,
                  journal_entry_id, reversed_at, reversal_journal_entry_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.tenant_id)
    .bind(new.bill_id)
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
) -> Result<ApPayment, ApPaymentError> {
    sqlx::query_as::<_, ApPayment>(
        "SELECT id, tenant_id, bill_id, payment_date, amount, bank_account_code,
                journal_entry_id, reversed_at, reversal_journal_entry_id
         FROM ap_payments WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApPaymentError::NotFound { tenant_id, id })
}

pub async fn list_for_bill(
    pool: impl sqlx::PgExecutor<'_>,
    bill_id: Uuid,
) -> Result<Vec<ApPayment>, ApPaymentError> {
    let payments = sqlx::query_as::<_, ApPayment>(
        "SELECT id, tenant_id, bill_id, payment_date, amount, bank_account_code,
                journal_entry_id, reversed_at, reversal_journal_entry_id
         FROM ap_payments WHERE bill_id = $1 ORDER BY payment_date, created_at",
    )
    .bind(bill_id)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}

pub async fn mark_reversed(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    reversal_journal_entry_id: Uuid,
) -> Result<(), ApPaymentError> {
    sqlx::query(
        "UPDATE ap_payments SET reversed_at = now(), reversal_journal_entry_id = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(reversal_journal_entry_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
