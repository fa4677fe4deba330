//! AP summary & aging (C13): the reversed-polarity mirror of
//! [`crate::repos::ar_aging_repo`] against `ap_rs`'s bill ledger.

use ap_rs::repos::bill_repo::{Bill, BillStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApAgingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApAgingBucket {
    pub current: Decimal,
    pub days_1_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_90: Decimal,
    pub days_over_90: Decimal,
}

impl Default for ApAgingBucket {
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
pub struct ApAgingLine {
    pub bill_id: Uuid,
    pub vendor_id: Uuid,
    pub number: String,
    pub due_date: NaiveDate,
    pub age_days: i64,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApAgingReport {
    pub as_of: NaiveDate,
    pub total_outstanding: Decimal,
    pub bucket_totals: ApAgingBucket,
    pub lines: Vec<ApAgingLine>,
}

fn bucket_for(age_days: i64, bucket: &mut ApAgingBucket, outstanding: Decimal) {
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

pub async fn ap_aging(pool: &PgPool, tenant_id: Uuid, as_of: NaiveDate) -> Result<ApAgingReport, ApAgingError> {
    let bills: Vec<Bill> = ap_rs::repos::bill_repo::list(pool, tenant_id).await?;

    let mut lines = Vec::new();
    let mut bucket_totals = ApAgingBucket::default();
    let mut total_outstanding = Decimal::ZERO;

    for bill in bills {
        if !matches!(bill.status, BillStatus::Posted | BillStatus::Partial) {
            continue;
        }
        let outstanding = bill.total - bill.amount_paid;
        if outstanding <= Decimal::ZERO {
            continue;
        }
        let due_date = bill.due_date.unwrap_or(bill.bill_date);
        let age_days = (as_of - due_date).num_days();

        bucket_for(age_days, &mut bucket_totals, outstanding);
        total_outstanding += outstanding;
        lines.push(ApAgingLine {
            bill_id: bill.id,
            vendor_id: bill.vendor_id,
            number: bill.number,
            due_date,
            age_days,
            outstanding,
        });
    }

    lines.sort_by(|a, b| b.age_days.cmp(&a.age_days));

    Ok(ApAgingReport {
        as_of,
        total_outstanding,
        bucket_totals,
        lines,
    })
}
