//! Vendor credit issuance (Dr AP / Cr Expense) and application against an
//! open bill. Reversed-polarity mirror of `ar-rs`'s `credit_note_service`:
//! issuance posts the GL entry once, application is bookkeeping only and
//! folds the allocation into the bill's recomputed `amountPaid`.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::{AP_CODE, TAX_RECEIVABLE_CODE};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::ap_payment_repo::ApPaymentError;
use crate::repos::bill_repo::{self, BillError, BillStatus};
use crate::repos::vendor_credit_repo::{self, NewVendorCredit, VendorCredit, VendorCreditError};

#[derive(Debug, thiserror::Error)]
pub enum VendorCreditServiceError {
    #[error("vendor credit amount must be greater than zero")]
    InvalidAmount,
    #[error("application amount must be greater than zero")]
    InvalidApplicationAmount,
    #[error("vendor credit {id} has only {available} remaining to apply")]
    InsufficientCredit { id: Uuid, available: Decimal },
    #[error("bill {id} is VOID or DRAFT and cannot accept a vendor credit")]
    BillNotPayable { id: Uuid },
    #[error("applying this vendor credit would overpay bill {bill_id}")]
    Overpayment { bill_id: Uuid },
    #[error(transparent)]
    VendorCredit(#[from] VendorCreditError),
    #[error(transparent)]
    Bill(#[from] BillError),
    #[error(transparent)]
    Payment(#[from] ApPaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

pub struct IssueVendorCreditInput {
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub credit_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub expense_account_code: String,
    pub tax_amount: Decimal,
    pub closed_through_date: Option<NaiveDate>,
}

pub async fn issue_vendor_credit(
    tx: &mut Transaction<'_, Postgres>,
    input: IssueVendorCreditInput,
) -> Result<VendorCredit, VendorCreditServiceError> {
    if input.amount <= Decimal::ZERO {
        return Err(VendorCreditServiceError::InvalidAmount);
    }

    let event_id = Uuid::new_v4();
    let net_amount = input.amount - input.tax_amount;
    let mut lines = vec![
        JournalLine {
            account_ref: AP_CODE.to_string(),
            debit: input.amount,
            credit: Decimal::ZERO,
            memo: Some("Vendor credit".to_string()),
            dimensions: None,
        },
        JournalLine {
            account_ref: input.expense_account_code.clone(),
            debit: Decimal::ZERO,
            credit: net_amount,
            memo: Some("Vendor credit".to_string()),
            dimensions: None,
        },
    ];
    if input.tax_amount > Decimal::ZERO {
        lines.push(JournalLine {
            account_ref: TAX_RECEIVABLE_CODE.to_string(),
            debit: Decimal::ZERO,
            credit: input.tax_amount,
            memo: Some("Vendor credit tax".to_string()),
            dimensions: None,
        });
    }

    let payload = GlPostingRequestV1 {
        posting_date: input.credit_date.format("%Y-%m-%d").to_string(),
        currency: input.currency.clone(),
        source_doc_type: SourceDocType::ArCreditMemo,
        source_doc_id: event_id.to_string(),
        description: "Vendor credit".to_string(),
        lines,
    };

    let tenant_id_str = input.tenant_id.to_string();
    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        input.closed_through_date,
        "ap",
        event_id,
        &event_id.to_string(),
        &payload,
    )
    .await?;

    let vendor_credit = vendor_credit_repo::insert(
        tx,
        NewVendorCredit {
            tenant_id: input.tenant_id,
            vendor_id: input.vendor_id,
            credit_date: input.credit_date,
            currency: input.currency,
            amount: input.amount,
            expense_account_code: input.expense_account_code,
            tax_amount: input.tax_amount,
            journal_entry_id,
        },
    )
    .await?;

    event_bus::outbox::enqueue(
        tx,
        Some(input.tenant_id),
        "vendor_credit",
        vendor_credit.id,
        "ap.vendor_credit.issued.v1",
        1,
        &platform_contracts::VendorCreditIssuedV1 {
            vendor_credit_id: vendor_credit.id,
            tenant_id: input.tenant_id,
            vendor_id: input.vendor_id,
            amount: input.amount.to_string(),
        },
    )
    .await?;

    Ok(vendor_credit)
}

pub async fn apply_vendor_credit(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    vendor_credit_id: Uuid,
    bill_id: Uuid,
    amount: Decimal,
) -> Result<(), VendorCreditServiceError> {
    if amount <= Decimal::ZERO {
        return Err(VendorCreditServiceError::InvalidApplicationAmount);
    }

    let vendor_credit = vendor_credit_repo::lock_by_id(tx, tenant_id, vendor_credit_id).await?;
    let available = vendor_credit.amount - vendor_credit.amount_applied;
    if amount > available {
        return Err(VendorCreditServiceError::InsufficientCredit {
            id: vendor_credit_id,
            available,
        });
    }

    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, bill_id).await?;
    if !matches!(bill.status, BillStatus::Posted | BillStatus::Partial) {
        return Err(VendorCreditServiceError::BillNotPayable { id: bill_id });
    }

    let already_paid = bill_repo::recompute_amount_paid(&mut **tx, bill_id).await?;
    let new_total_paid = already_paid + amount;
    if new_total_paid > bill.total {
        return Err(VendorCreditServiceError::Overpayment { bill_id });
    }

    vendor_credit_repo::add_application_amount(tx, vendor_credit_id, amount).await?;
    vendor_credit_repo::insert_application(tx, tenant_id, vendor_credit_id, bill_id, amount).await?;

    let new_status = if new_total_paid >= bill.total {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    };
    bill_repo::update_amount_paid_and_status(tx, bill_id, new_total_paid, new_status).await?;

    Ok(())
}
