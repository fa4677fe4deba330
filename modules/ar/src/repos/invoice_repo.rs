//! `Invoice`/`InvoiceLine` (spec §3). Status is stored, not derived at read
//! time, so a read never has to recompute C6's status law — `invoice_service`
//! recomputes and writes it back on every mutation that changes `amountPaid`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Posted,
    Partial,
    Paid,
    Void,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub number: String,
    pub status: InvoiceStatus,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub journal_entry_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub income_account_code: String,
}

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("invoice not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("invoice number '{number}' already exists for tenant {tenant_id}")]
    DuplicateNumber { tenant_id: Uuid, number: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub income_account_code: String,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub number: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub location_id: Option<Uuid>,
    pub lines: Vec<NewInvoiceLine>,
}

pub async fn insert_draft(
    tx: &mut Transaction<'_, Postgres>,
    new: NewInvoice,
) -> Result<(Invoice, Vec<InvoiceLine>), InvoiceError> {
    let id = Uuid::new_v4();
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices
            (id, tenant_id, customer_id, number, status, invoice_date, due_date,
             currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
             location_id, created_at)
        VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9, $10, 0, NULL, $11, now())
        RETURNING id, tenant_id, customer_id, number, status, invoice_date, due_date,
                  currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                  location_id
        "#,
    )
    .bind(id)
    .bind(new.tenant_id)
    .bind(new.customer_id)
    .bind(&new.number)
    .bind(new.invoice_date)
    .bind(new.due_date)
    .bind(&new.currency)
    .bind(new.subtotal)
    .bind(new.tax_amount)
    .bind(new.total)
    .bind(new.location_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => InvoiceError::DuplicateNumber {
            tenant_id: new.tenant_id,
            number: new.number.clone(),
        },
        _ => InvoiceError::Database(e),
    })?;

    let mut lines = Vec::with_capacity(new.lines.len());
    for line in &new.lines {
        let row = sqlx::query_as::<_, InvoiceLine>(
            r#"
            INSERT INTO invoice_lines
                (id, invoice_id, tenant_id, item_id, description, quantity, unit_price,
                 discount_amount, tax_rate, tax_amount, line_total, income_account_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, invoice_id, tenant_id, item_id, description, quantity, unit_price,
                      discount_amount, tax_rate, tax_amount, line_total, income_account_code
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(new.tenant_id)
        .bind(line.item_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount_amount)
        .bind(line.tax_rate)
        .bind(line.tax_amount)
        .bind(line.line_total)
        .bind(&line.income_account_code)
        .fetch_one(&mut **tx)
        .await?;
        lines.push(row);
    }

    Ok((invoice, lines))
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Invoice, InvoiceError> {
    find_by_id_opt(pool, tenant_id, id)
        .await?
        .ok_or(InvoiceError::NotFound { tenant_id, id })
}

pub async fn find_by_id_opt(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Option<Invoice>, InvoiceError> {
    let invoice = sqlx::query_as::<_, Invoice>(
        "SELECT id, tenant_id, customer_id, number, status, invoice_date, due_date,
                currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                location_id
         FROM invoices WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(invoice)
}

pub async fn lines_for(
    pool: impl sqlx::PgExecutor<'_>,
    invoice_id: Uuid,
) -> Result<Vec<InvoiceLine>, InvoiceError> {
    let lines = sqlx::query_as::<_, InvoiceLine>(
        "SELECT id, invoice_id, tenant_id, item_id, description, quantity, unit_price,
                discount_amount, tax_rate, tax_amount, line_total, income_account_code
         FROM invoice_lines WHERE invoice_id = $1",
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}

pub async fn list(pool: impl sqlx::PgExecutor<'_>, tenant_id: Uuid) -> Result<Vec<Invoice>, InvoiceError> {
    let invoices = sqlx::query_as::<_, Invoice>(
        "SELECT id, tenant_id, customer_id, number, status, invoice_date, due_date,
                currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                location_id
         FROM invoices WHERE tenant_id = $1 ORDER BY invoice_date DESC, number DESC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

#[allow(clippy::too_many_arguments)]
pub async fn mark_posted(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    journal_entry_id: Uuid,
) -> Result<(), InvoiceError> {
    sqlx::query("UPDATE invoices SET status = 'posted', journal_entry_id = $2 WHERE id = $1")
        .bind(id)
        .bind(journal_entry_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn update_amount_paid_and_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    amount_paid: Decimal,
    status: InvoiceStatus,
) -> Result<(), InvoiceError> {
    sqlx::query("UPDATE invoices SET amount_paid = $2, status = $3 WHERE id = $1")
        .bind(id)
        .bind(amount_paid)
        .bind(status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_void(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), InvoiceError> {
    sqlx::query("UPDATE invoices SET status = 'void' WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// T5's authoritative `amountPaid`: non-reversed cash payments plus applied
/// credit notes plus applied customer advances. Per spec.md's Open Question
/// decision on the `amountPaid` cache/authority split, every settlement path
/// (cash payment, credit-note application, advance application) recomputes
/// from all three tables rather than reading the cached column or summing
/// only its own table — that narrower sum is what let one settlement type
/// silently undercount (and regress) the total when another had already
/// contributed to it.
pub async fn recompute_amount_paid(
    pool: impl sqlx::PgExecutor<'_>,
    invoice_id: Uuid,
) -> Result<Decimal, InvoiceError> {
    let (total,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT
            COALESCE((SELECT SUM(amount) FROM ar_payments
                      WHERE invoice_id = $1 AND reversed_at IS NULL), 0)
          + COALESCE((SELECT SUM(amount) FROM credit_note_applications
                      WHERE invoice_id = $1), 0)
          + COALESCE((SELECT SUM(amount) FROM customer_advance_applications
                      WHERE invoice_id = $1), 0)
        "#,
    )
    .bind(invoice_id)
    .fetch_one(pool)
    .await?;
    Ok(total)
}
