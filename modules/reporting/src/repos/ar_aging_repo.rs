//! AR summary & aging (C13): balances are each invoice's `total − amountPaid`
//! — `amountPaid` already reflects payments plus applied credit notes and
//! customer advances per T5 (`ar_rs`'s own invariant), so this repo never
//! re-sums settlement tables itself. Only POSTED/PARTIAL invoices carry an
//! outstanding balance; PAID and VOID are excluded, DRAFT never posted.

use ar_rs::repos::invoice_repo::{Invoice, InvoiceStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ArAgingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArAgingBucket {
    pub current: Decimal,
    pub days_1_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_90: Decimal,
    pub days_over_90: Decimal,
}

impl Default for ArAgingBucket {
    fn default() -> Self {
        Self {
            current: Decimal::ZERO,
            days_1_30: Decimal::ZERO,
            days_31_60: Decimal::ZERO,
            days_61_90: Decimal::ZERO,
            days_over_90: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArAgingLine {
    pub invoice_id: Uuid,
    pub customer_id: Uuid,
    pub number: String,
    pub due_date: NaiveDate,
    pub age_days: i64,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArAgingReport {
    pub as_of: NaiveDate,
    pub total_outstanding: Decimal,
    pub bucket_totals: ArAgingBucket,
    pub lines: Vec<ArAgingLine>,
}

fn bucket_for(age_days: i64, bucket: &mut ArAgingBucket, outstanding: Decimal) {
    if age_days <= 0 {
        bucket.current += outstanding;
    } else if age_days <= 30 {
        bucket.days_1_30 += outstanding;
    } else if age_days <= 60 {
        bucket.days_31_60 += outstanding;
    } else if age_days <= 90 {
        bucket.days_61_90 += outstanding;
    } else {
        bucket.days_over_90 += outstanding;
    }
}

pub async fn ar_aging(pool: &PgPool, tenant_id: Uuid, as_of: NaiveDate) -> Result<ArAgingReport, ArAgingError> {
    let invoices: Vec<Invoice> = ar_rs::repos::invoice_repo::list(pool, tenant_id).await?;

    let mut lines = Vec::new();
    let mut bucket_totals = ArAgingBucket::default();
    let mut total_outstanding = Decimal::ZERO;

    for invoice in invoices {
        if !matches!(invoice.status, InvoiceStatus::Posted | InvoiceStatus::Partial) {
            continue;
        }
        let outstanding = invoice.total - invoice.amount_paid;
        if outstanding <= Decimal::ZERO {
            continue;
        }
        let due_date = invoice.due_date.unwrap_or(invoice.invoice_date);
        let age_days = (as_of - due_date).num_days();

        bucket_for(age_days, &mut bucket_totals, outstanding);
        total_outstanding += outstanding;
        lines.push(ArAgingLine {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            number: invoice.number,
            due_date,
            age_days,
            outstanding,
        });
    }

    lines.sort_by(|a, b| b.age_days.cmp(&a.age_days));

    Ok(ArAgingReport {
        as_of,
        total_outstanding,
        bucket_totals,
        lines,
    })
}
