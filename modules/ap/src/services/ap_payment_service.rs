//! C7 payment recording and reversal: Dr AP / Cr Bank. Reversed-polarity
//! mirror of `ar-rs`'s `payment_service` — `bills.amount_paid` is recomputed
//! from all three settlement tables on every event rather than cached, so a
//! vendor credit or vendor advance applied after a cash payment can never
//! make the running total regress (see `bill_repo::recompute_amount_paid`).

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::AP_CODE;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::ap_payment_repo::{self, ApPayment, ApPaymentError, NewApPayment};
use crate::repos::bill_repo::{self, Bill, BillError, BillStatus};

#[derive(Debug, thiserror::Error)]
pub enum ApPaymentServiceError {
    #[error("payment amount must be greater than zero")]
    InvalidAmount,
    #[error("bill {id} is VOID or DRAFT and cannot accept payments")]
    BillNotPayable { id: Uuid },
    #[error("payment would overpay bill {bill_id}")]
    Overpayment { bill_id: Uuid },
    #[error(transparent)]
    Bill(#[from] BillError),
    #[error(transparent)]
    Payment(#[from] ApPaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

fn status_for_amount_paid(total: Decimal, amount_paid: Decimal) -> BillStatus {
    if amount_paid <= Decimal::ZERO {
        BillStatus::Posted
    } else if amount_paid >= total {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    }
}

pub struct RecordedApPayment {
    pub payment: ApPayment,
    pub bill: Bill,
}

pub async fn record_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    bill_id: Uuid,
    payment_date: NaiveDate,
    amount: Decimal,
    bank_account_code: String,
    closed_through_date: Option<NaiveDate>,
) -> Result<RecordedApPayment, ApPaymentServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ApPaymentServiceError::InvalidAmount);
    }
    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, bill_id).await?;
    if !matches!(bill.status, BillStatus::Posted | BillStatus::Partial) {
        return Err(ApPaymentServiceError::BillNotPayable { id: bill_id });
    }

    let already_settled = bill_repo::recompute_amount_paid(&mut **tx, bill_id).await?;
    let new_total_paid = already_settled + amount;
    if new_total_paid > bill.total {
        return Err(ApPaymentServiceError::Overpayment { bill_id });
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: payment_date.format("%Y-%m-%d").to_string(),
        currency: bill.currency.clone(),
        source_doc_type: SourceDocType::ApPayment,
        source_doc_id: format!("{bill_id}:{event_id}"),
        description: format!("Payment against bill {}", bill.number),
        lines: vec![
            JournalLine {
                account_ref: AP_CODE.to_string(),
                debit: amount,
                credit: Decimal::ZERO,
                memo: Some(format!("Payment for bill {}", bill.number)),
                dimensions: None,
            },
            JournalLine {
                account_ref: bank_account_code.clone(),
                debit: Decimal::ZERO,
                credit: amount,
                memo: Some(format!("Payment for bill {}", bill.number)),
                dimensions: None,
            },
        ],
    };

    let tenant_id_str = tenant_id.to_string();
    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ap",
        event_id,
        &bill_id.to_string(),
        &payload,
    )
    .await?;

    let payment = ap_payment_repo::insert(
        tx,
        NewApPayment {
            tenant_id,
            bill_id,
            payment_date,
            amount,
            bank_account_code,
            journal_entry_id,
        },
    )
    .await?;

    let new_status = status_for_amount_paid(bill.total, new_total_paid);
    bill_repo::update_amount_paid_and_status(tx, bill_id, new_total_paid, new_status).await?;

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "ap_payment",
        payment.id,
        "ap.payment.recorded.v1",
        1,
        &platform_contracts::BillPaymentRecordedV1 {
            payment_id: payment.id,
            tenant_id,
            bill_id,
            amount: amount.to_string(),
        },
    )
    .await?;

    let mut bill = bill;
    bill.amount_paid = new_total_paid;
    bill.status = new_status;

    Ok(RecordedApPayment { payment, bill })
}

pub struct ReversedApPayment {
    pub payment: ApPayment,
    pub bill: Bill,
    pub reversal_journal_entry_id: Uuid,
}

pub async fn void_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    payment_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<ReversedApPayment, ApPaymentServiceError> {
    let payment = ap_payment_repo::find_by_id(&mut **tx, tenant_id, payment_id).await?;
    if payment.reversed_at.is_some() {
        return Err(ApPaymentServiceError::Payment(ApPaymentError::AlreadyReversed { id: payment_id }));
    }
    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, payment.bill_id).await?;

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        currency: bill.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: format!("void:{payment_id}"),
        description: format!(
            "Void payment against bill {} (entry {})",
            bill.number, payment.journal_entry_id
        ),
        lines: vec![
            JournalLine {
                account_ref: payment.bank_account_code.clone(),
                debit: payment.amount,
                credit: Decimal::ZERO,
                memo: Some("Payment reversal".to_string()),
                dimensions: None,
            },
            JournalLine {
                account_ref: AP_CODE.to_string(),
                debit: Decimal::ZERO,
                credit: payment.amount,
                memo: Some("Payment reversal".to_string()),
                dimensions: None,
            },
        ],
    };

    let tenant_id_str = tenant_id.to_string();
    let reversal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ap",
        event_id,
        &payment_id.to_string(),
        &payload,
    )
    .await?;

    ap_payment_repo::mark_reversed(tx, payment_id, reversal_entry_id).await?;

    let still_paid = bill_repo::recompute_amount_paid(&mut **tx, bill.id).await?;
    let new_status = if bill.status == BillStatus::Void {
        BillStatus::Void
    } else {
        status_for_amount_paid(bill.total, still_paid)
    };
    bill_repo::update_amount_paid_and_status(tx, bill.id, still_paid, new_status).await?;

    let mut payment = payment;
    payment.reversed_at = Some(chrono::Utc::now());
    payment.reversal_journal_entry_id = Some(reversal_entry_id);

    let mut bill = bill;
    bill.amount_paid = still_paid;
    bill.status = new_status;

    Ok(ReversedApPayment {
        payment,
        bill,
        reversal_journal_entry_id: reversal_entry_id,
    })
}
