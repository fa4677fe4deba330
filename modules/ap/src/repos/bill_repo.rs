//! `Bill`/`BillLine` (spec §4.7). Status is stored, not derived at read time,
//! mirroring `ar-rs`'s `invoice_repo` — `bill_service` recomputes it and
//! writes it back on every mutation that changes `amountPaid`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "bill_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Draft,
    Posted,
    Partial,
    Paid,
    Void,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub number: String,
    pub status: BillStatus,
    pub bill_date: NaiveDate,
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
pub struct BillLine {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub expense_account_code: String,
}

#[derive(Debug, Error)]
pub enum BillError {
    #[error("bill not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },
    #[error("bill number '{number}' already exists for tenant {tenant_id}")]
    DuplicateNumber { tenant_id: Uuid, number: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewBillLine {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub expense_account_code: String,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub number: String,
    pub bill_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub location_id: Option<Uuid>,
    pub lines: Vec<NewBillLine>,
}

pub async fn insert_draft(
    tx: &mut Transaction<'_, Postgres>,
    new: NewBill,
) -> Result<(Bill, Vec<BillLine>), BillError> {
    let id = Uuid::new_v4();
    let bill = sqlx::query_as::<_, Bill>(
        r#"
        INSERT INTO bills
            (id, tenant_id, vendor_id, number, status, bill_date, due_date,
             currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
             location_id, created_at)
        VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9, $10, 0, NULL, $11, now())
        RETURNING id, tenant_id, vendor_id, number, status, bill_date, due_date,
                  currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                  location_id
        "#,
    )
    .bind(id)
    .bind(new.tenant_id)
    .bind(new.vendor_id)
    .bind(&new.number)
    .bind(new.bill_date)
    .bind(new.due_date)
    .bind(&new.currency)
    .bind(new.subtotal)
    .bind(new.tax_amount)
    .bind(new.total)
    .bind(new.location_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => BillError::DuplicateNumber {
            tenant_id: new.tenant_id,
            number: new.number.clone(),
        },
        _ => BillError::Database(e),
    })?;

    let mut lines = Vec::with_capacity(new.lines.len());
    for line in &new.lines {
        let row = sqlx::query_as::<_, BillLine>(
            r#"
            INSERT INTO bill_lines
                (id, bill_id, tenant_id, item_id, description, quantity, unit_cost,
                 discount_amount, tax_rate, tax_amount, line_total, expense_account_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, bill_id, tenant_id, item_id, description, quantity, unit_cost,
                      discount_amount, tax_rate, tax_amount, line_total, expense_account_code
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(new.tenant_id)
        .bind(line.item_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_cost)
        .bind(line.discount_amount)
        .bind(line.tax_rate)
        .bind(line.tax_amount)
        .bind(line.line_total)
        .bind(&line.expense_account_code)
        .fetch_one(&mut **tx)
        .await?;
        lines.push(row);
    }

    Ok((bill, lines))
}

pub async fn find_by_id(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Bill, BillError> {
    find_by_id_opt(pool, tenant_id, id)
        .await?
        .ok_or(BillError::NotFound { tenant_id, id })
}

pub async fn find_by_id_opt(
    pool: impl sqlx::PgExecutor<'_>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Option<Bill>, BillError> {
    let bill = sqlx::query_as::<_, Bill>(
        "SELECT id, tenant_id, vendor_id, number, status, bill_date, due_date,
                currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                location_id
         FROM bills WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(bill)
}

pub async fn lines_for(
    pool: impl sqlx::PgExecutor<'_>,
    bill_id: Uuid,
) -> Result<Vec<BillLine>, BillError> {
    let lines = sqlx::query_as::<_, BillLine>(
        "SELECT id, bill_id, tenant_id, item_id, description, quantity, unit_cost,
                discount_amount, tax_rate, tax_amount, line_total, expense_account_code
         FROM bill_lines WHERE bill_id = $1",
    )
    .bind(bill_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}

pub async fn list(pool: impl sqlx::PgExecutor<'_>, tenant_id: Uuid) -> Result<Vec<Bill>, BillError> {
    let bills = sqlx::query_as::<_, Bill>(
        "SELECT id, tenant_id, vendor_id, number, status, bill_date, due_date,
                currency, subtotal, tax_amount, total, amount_paid, journal_entry_id,
                location_id
         FROM bills WHERE tenant_id = $1 ORDER BY bill_date DESC, number DESC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(bills)
}

pub async fn mark_posted(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    journal_entry_id: Uuid,
) -> Result<(), BillError> {
    sqlx::query("UPDATE bills SET status = 'posted', journal_entry_id = $2 WHERE id = $1")
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
    status: BillStatus,
) -> Result<(), BillError> {
    sqlx::query("UPDATE bills SET amount_paid = $2, status = $3 WHERE id = $1")
        .bind(id)
        .bind(amount_paid)
        .bind(status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_void(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), BillError> {
    sqlx::query("UPDATE bills SET status = 'void' WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Authoritative `amountPaid`: non-reversed cash payments plus applied
/// vendor credits plus applied vendor advances. Recomputed from all three
/// settlement tables rather than cached, mirroring `ar-rs`'s
/// `invoice_repo::recompute_amount_paid` (see DESIGN.md).
pub async fn recompute_amount_paid(
    pool: impl sqlx::PgExecutor<'_>,
    bill_id: Uuid,
) -> Result<Decimal, BillError> {
    let (total,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT
            COALESCE((SELECT SUM(amount) FROM ap_payments
                      WHERE bill_id = $1 AND reversed_at IS NULL), 0)
          + COALESCE((SELECT SUM(amount) FROM vendor_credit_applications
                      WHERE bill_id = $1), 0)
          + COALESCE((SELECT SUM(amount) FROM vendor_advance_applications
                      WHERE bill_id = $1), 0)
        "#,
    )
    .bind(bill_id)
    .fetch_one(pool)
    .await?;
    Ok(total)
}
