//! Credit note issuance (Dr income / Cr AR) and application against an open
//! invoice, reducing `amountPaid`-equivalent exposure the same way a cash
//! payment does — `invoice_service`'s status law only looks at total owed
//! vs. total settled, so an applied credit note is folded into the same
//! `amount_paid` column a cash payment would update.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::{AR_CODE, TAX_PAYABLE_CODE};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::credit_note_repo::{self, CreditNote, CreditNoteError, NewCreditNote};
use crate::repos::invoice_repo::{self, InvoiceError, InvoiceStatus};
use crate::repos::payment_repo::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum CreditNoteServiceError {
    #[error("credit note amount must be greater than zero")]
    InvalidAmount,
    #[error("application amount must be greater than zero")]
    InvalidApplicationAmount,
    #[error("credit note {id} has only {available} remaining to apply")]
    InsufficientCredit { id: Uuid, available: Decimal },
    #[error("invoice {id} is VOID or DRAFT and cannot accept a credit note")]
    InvoiceNotPayable { id: Uuid },
    #[error("applying this credit note would overpay invoice {invoice_id}")]
    Overpayment { invoice_id: Uuid },
    #[error(transparent)]
    CreditNote(#[from] CreditNoteError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

pub struct IssueCreditNoteInput {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub income_account_code: String,
    pub tax_amount: Decimal,
    pub closed_through_date: Option<NaiveDate>,
}

pub async fn issue_credit_note(
    tx: &mut Transaction<'_, Postgres>,
    input: IssueCreditNoteInput,
) -> Result<CreditNote, CreditNoteServiceError> {
    if input.amount <= Decimal::ZERO {
        return Err(CreditNoteServiceError::InvalidAmount);
    }

    let event_id = Uuid::new_v4();
    let net_amount = input.amount - input.tax_amount;
    let mut lines = vec![
        JournalLine {
            account_ref: input.income_account_code.clone(),
            debit: net_amount,
            credit: Decimal::ZERO,
            memo: Some("Credit note".to_string()),
            dimensions: None,
        },
        JournalLine {
            account_ref: AR_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: input.amount,
            memo: Some("Credit note".to_string()),
            dimensions: None,
        },
    ];
    if input.tax_amount > Decimal::ZERO {
        lines.push(JournalLine {
            account_ref: TAX_PAYABLE_CODE.to_string(),
            debit: input.tax_amount,
            credit: Decimal::ZERO,
            memo: Some("Credit note tax".to_string()),
            dimensions: None,
        });
    }

    let payload = GlPostingRequestV1 {
        posting_date: input.credit_date.format("%Y-%m-%d").to_string(),
        currency: input.currency.clone(),
        source_doc_type: SourceDocType::ArCreditMemo,
        source_doc_id: event_id.to_string(),
        description: "Credit note".to_string(),
        lines,
    };

    let tenant_id_str = input.tenant_id.to_string();
    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        input.closed_through_date,
        "ar",
        event_id,
        &event_id.to_string(),
        &payload,
    )
    .await?;

    let credit_note = credit_note_repo::insert(
        tx,
        NewCreditNote {
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            credit_date: input.credit_date,
            currency: input.currency,
            amount: input.amount,
            income_account_code: input.income_account_code,
            tax_amount: input.tax_amount,
            journal_entry_id,
        },
    )
    .await?;

    event_bus::outbox::enqueue(
        tx,
        Some(input.tenant_id),
        "credit_note",
        credit_note.id,
        "ar.credit_note.issued.v1",
        1,
        &platform_contracts::CreditNoteIssuedV1 {
            credit_note_id: credit_note.id,
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            amount: input.amount.to_string(),
        },
    )
    .await?;

    Ok(credit_note)
}

/// Applies part or all of a credit note's remaining balance against an
/// invoice. Posts no new GL entry — the credit note's issuance already
/// moved the AR balance; application is bookkeeping that ties the credit to
/// a specific invoice and folds it into that invoice's settled amount.
pub async fn apply_credit_note(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    credit_note_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
) -> Result<(), CreditNoteServiceError> {
    if amount <= Decimal::ZERO {
        return Err(CreditNoteServiceError::InvalidApplicationAmount);
    }

    let credit_note = credit_note_repo::lock_by_id(tx, tenant_id, credit_note_id).await?;
    let available = credit_note.amount - credit_note.amount_applied;
    if amount > available {
        return Err(CreditNoteServiceError::InsufficientCredit {
            id: credit_note_id,
            available,
        });
    }

    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, invoice_id).await?;
    if !matches!(invoice.status, InvoiceStatus::Posted | InvoiceStatus::Partial) {
        return Err(CreditNoteServiceError::InvoiceNotPayable { id: invoice_id });
    }

    let already_paid = invoice_repo::recompute_amount_paid(&mut **tx, invoice_id).await?;
    let new_total_paid = already_paid + amount;
    if new_total_paid > invoice.total {
        return Err(CreditNoteServiceError::Overpayment { invoice_id });
    }

    credit_note_repo::add_application_amount(tx, credit_note_id, amount).await?;
    credit_note_repo::insert_application(tx, tenant_id, credit_note_id, invoice_id, amount).await?;

    let new_status = if new_total_paid >= invoice.total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    };
    invoice_repo::update_amount_paid_and_status(tx, invoice_id, new_total_paid, new_status).await?;

    Ok(())
}
