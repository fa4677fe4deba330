//! Customer advance receipt (Dr Bank / Cr Customer Advance Liability) and
//! application against an open invoice. Mirrors `credit_note_service`'s
//! split between "post a GL entry once, on receipt" and "application is
//! bookkeeping only" — applying an advance moves no money, it just ties a
//! previously-posted liability to a specific invoice's settled amount.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::CUSTOMER_ADVANCE_LIABILITY_CODE;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::customer_advance_repo::{self, CustomerAdvance, CustomerAdvanceError, NewCustomerAdvance};
use crate::repos::invoice_repo::{self, InvoiceError, InvoiceStatus};
use crate::repos::payment_repo::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum CustomerAdvanceServiceError {
    #[error("advance amount must be greater than zero")]
    InvalidAmount,
    #[error("application amount must be greater than zero")]
    InvalidApplicationAmount,
    #[error("advance {id} has only {available} remaining to apply")]
    InsufficientAdvance { id: Uuid, available: Decimal },
    #[error("invoice {id} is VOID or DRAFT and cannot accept an advance")]
    InvoiceNotPayable { id: Uuid },
    #[error("applying this advance would overpay invoice {invoice_id}")]
    Overpayment { invoice_id: Uuid },
    #[error(transparent)]
    Advance(#[from] CustomerAdvanceError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

pub struct ReceiveCustomerAdvanceInput {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub received_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub closed_through_date: Option<NaiveDate>,
}

pub async fn receive_customer_advance(
    tx: &mut Transaction<'_, Postgres>,
    input: ReceiveCustomerAdvanceInput,
) -> Result<CustomerAdvance, CustomerAdvanceServiceError> {
    if input.amount <= Decimal::ZERO {
        return Err(CustomerAdvanceServiceError::InvalidAmount);
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: input.received_date.format("%Y-%m-%d").to_string(),
        currency: input.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: event_id.to_string(),
        description: "Customer advance received".to_string(),
        lines: vec![
            JournalLine {
                account_ref: input.bank_account_code.clone(),
                debit: input.amount,
                credit: Decimal::ZERO,
                memo: Some("Customer advance".to_string()),
                dimensions: None,
            },
            JournalLine {
                account_ref: CUSTOMER_ADVANCE_LIABILITY_CODE.to_string(),
                debit: Decimal::ZERO,
                credit: input.amount,
                memo: Some("Customer advance".to_string()),
                dimensions: None,
            },
        ],
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

    let advance = customer_advance_repo::insert(
        tx,
        NewCustomerAdvance {
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            received_date: input.received_date,
            currency: input.currency,
            amount: input.amount,
            bank_account_code: input.bank_account_code,
            journal_entry_id,
        },
    )
    .await?;

    event_bus::outbox::enqueue(
        tx,
        Some(input.tenant_id),
        "customer_advance",
        advance.id,
        "ar.customer_advance.received.v1",
        1,
        &platform_contracts::CustomerAdvanceReceivedV1 {
            advance_id: advance.id,
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            amount: input.amount.to_string(),
        },
    )
    .await?;

    Ok(advance)
}

/// Applies part or all of an advance's remaining balance against an
/// invoice: Dr Customer Advance Liability / Cr AR was already posted on
/// receipt, so application here only records the allocation and folds it
/// into the invoice's settled amount, same as a credit-note application.
pub async fn apply_customer_advance(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    advance_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
) -> Result<(), CustomerAdvanceServiceError> {
    if amount <= Decimal::ZERO {
        return Err(CustomerAdvanceServiceError::InvalidApplicationAmount);
    }

    let advance = customer_advance_repo::lock_by_id(tx, tenant_id, advance_id).await?;
    let available = advance.amount - advance.amount_applied;
    if amount > available {
        return Err(CustomerAdvanceServiceError::InsufficientAdvance {
            id: advance_id,
            available,
        });
    }

    let invoice = invoice_repo::find_by_id(&mut **tx, tenant_id, invoice_id).await?;
    if !matches!(invoice.status, InvoiceStatus::Posted | InvoiceStatus::Partial) {
        return Err(CustomerAdvanceServiceError::InvoiceNotPayable { id: invoice_id });
    }

    let already_paid = invoice_repo::recompute_amount_paid(&mut **tx, invoice_id).await?;
    let new_total_paid = already_paid + amount;
    if new_total_paid > invoice.total {
        return Err(CustomerAdvanceServiceError::Overpayment { invoice_id });
    }

    customer_advance_repo::add_application_amount(tx, advance_id, amount).await?;
    customer_advance_repo::insert_application(tx, tenant_id, advance_id, invoice_id, amount).await?;

    let new_status = if new_total_paid >= invoice.total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    };
    invoice_repo::update_amount_paid_and_status(tx, invoice_id, new_total_paid, new_status).await?;

    Ok(())
}
