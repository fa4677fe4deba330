//! C6 payment recording and reversal: Dr Bank / Cr AR. `invoices.amount_paid`
//! is the single running total every settlement path (cash payment, credit
//! note application, advance application) adds to or subtracts from — it is
//! not recomputed from `ar_payments` alone, since that table only covers one
//! of the three ways an invoice gets settled.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::AR_CODE;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::invoice_repo::{self, Invoice, InvoiceError, InvoiceStatus};
use crate::repos::payment_repo::{self, NewPayment, Payment, PaymentError};

#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    #[error("payment amount must be greater than zero")]
    InvalidAmount,
    #[error("invoice {id} is VOID or DRAFT and cannot accept payments")]
    InvoiceNotPayable { id: Uuid },
    #[error("payment would overpay invoice {invoice_id}")]
    Overpayment { invoice_id: Uuid },
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

fn status_for_amount_paid(total: Decimal, amount_paid: Decimal) -> InvoiceStatus {
    if amount_paid <= Decimal::ZERO {
        InvoiceStatus::Posted
    } else if amount_paid >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

pub struct RecordedPayment {
    pub payment: Payment,
    pub invoice: Invoice,
}

pub async fn record_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    invoice_id: Uuid,
    payment_date: NaiveDate,
    amount: Decimal,
    bank_account_code: String,
    closed_through_date: Option<NaiveDate>,
) -> Result<RecordedPayment, PaymentServiceError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentServiceError::InvalidAmount);
    }
    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, invoice_id).await?;
    if !matches!(
        invoice.status,
        InvoiceStatus::Posted | InvoiceStatus::Partial
    ) {
        return Err(PaymentServiceError::InvoiceNotPayable { id: invoice_id });
    }

    let already_settled = invoice_repo::recompute_amount_paid(&mut **tx, invoice_id).await?;
    let new_total_paid = already_settled + amount;
    if new_total_paid > invoice.total {
        return Err(PaymentServiceError::Overpayment { invoice_id });
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: payment_date.format("%Y-%m-%d").to_string(),
        currency: invoice.currency.clone(),
        source_doc_type: SourceDocType::ArPayment,
        source_doc_id: format!("{invoice_id}:{event_id}"),
        description: format!("Payment against invoice {}", invoice.number),
        lines: vec![
            JournalLine {
                account_ref: bank_account_code.clone(),
                debit: amount,
                credit: Decimal::ZERO,
                memo: Some(format!("Payment for invoice {}", invoice.number)),
                dimensions: None,
            },
            JournalLine {
                account_ref: AR_CODE.to_string(),
                debit: Decimal::ZERO,
                credit: amount,
                memo: Some(format!("Payment for invoice {}", invoice.number)),
                dimensions: None,
            },
        ],
    };

    let tenant_id_str = tenant_id.to_string();
    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "ar",
        event_id,
        &invoice_id.to_string(),
        &payload,
    )
    .await?;

    let payment = payment_repo::insert(
        tx,
        NewPayment {
            tenant_id,
            invoice_id,
            payment_date,
            amount,
            bank_account_code,
            journal_entry_id,
        },
    )
    .await?;

    let new_status = status_for_amount_paid(invoice.total, new_total_paid);
    invoice_repo::update_amount_paid_and_status(tx, invoice_id, new_total_paid, new_status).await?;

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "payment",
        payment.id,
        "ar.payment.recorded.v1",
        1,
        &platform_contracts::PaymentRecordedV1 {
            payment_id: payment.id,
            tenant_id,
            invoice_id: Some(invoice_id),
            amount: amount.to_string(),
        },
    )
    .await?;

    let mut invoice = invoice;
    invoice.amount_paid = new_total_paid;
    invoice.status = new_status;

    Ok(RecordedPayment { payment, invoice })
}

pub struct ReversedPayment {
    pub payment: Payment,
    pub invoice: Invoice,
    pub reversal_journal_entry_id: Uuid,
}

pub async fn void_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    payment_id: Uuid,
    closed_through_date: Option<NaiveDate>,
) -> Result<ReversedPayment, PaymentServiceError> {
    let payment = payment_repo::find_by_id(&mut **tx, tenant_id, payment_id).await?;
    if payment.reversed_at.is_some() {
        return Err(PaymentServiceError::Payment(PaymentError::AlreadyReversed { id: payment_id }));
    }
    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, payment.invoice_id).await?;

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        currency: invoice.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: format!("void:{payment_id}"),
        description: format!(
            "Void payment against invoice {} (entry {})",
            invoice.number, payment.journal_entry_id
        ),
        lines: vec![
            JournalLine {
                account_ref: AR_CODE.to_string(),
                debit: payment.amount,
                credit: Decimal::ZERO,
                memo: Some("Payment reversal".to_string()),
                dimensions: None,
            },
            JournalLine {
                account_ref: payment.bank_account_code.clone(),
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
        "ar",
        event_id,
        &payment_id.to_string(),
        &payload,
    )
    .await?;

    payment_repo::mark_reversed(tx, payment_id, reversal_entry_id).await?;

    let still_paid = invoice_repo::recompute_amount_paid(&mut **tx, invoice.id).await?;
    let new_status = if invoice.status == InvoiceStatus::Void {
        InvoiceStatus::Void
    } else {
        status_for_amount_paid(invoice.total, still_paid)
    };
    invoice_repo::update_amount_paid_and_status(tx, invoice.id, still_paid, new_status).await?;

    event_bus::outbox::enqueue(
        tx,
        Some(tenant_id),
        "payment",
        payment_id,
        "ar.payment.reversed.v1",
        1,
        &platform_contracts::PaymentReversedV1 {
            payment_id,
            tenant_id,
            invoice_id: invoice.id,
            reversal_journal_entry_id: reversal_entry_id,
        },
    )
    .await?;

    let mut payment = payment;
    payment.reversed_at = Some(chrono::Utc::now());
    payment.reversal_journal_entry_id = Some(reversal_entry_id);

    let mut invoice = invoice;
    invoice.amount_paid = still_paid;
    invoice.status = new_status;

    Ok(ReversedPayment {
        payment,
        invoice,
        reversal_journal_entry_id: reversal_entry_id,
    })
}
