//! Vendor advance payment (Dr Vendor Advance Asset / Cr Bank) and
//! application against an open bill. Mirrors `ar-rs`'s
//! `customer_advance_service` with the balance-sheet side flipped: an
//! advance paid to a vendor is an asset until it is applied to a bill, the
//! same way a customer advance is a liability until applied to an invoice.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::VENDOR_ADVANCE_ASSET_CODE;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::ap_payment_repo::ApPaymentError;
use crate::repos::bill_repo::{self, BillError, BillStatus};
use crate::repos::vendor_advance_repo::{self, NewVendorAdvance, VendorAdvance, VendorAdvanceError};

#[derive(Debug, thiserror::Error)]
pub enum VendorAdvanceServiceError {
    #[error("advance amount must be greater than zero")]
    InvalidAmount,
    #[error("application amount must be greater than zero")]
    InvalidApplicationAmount,
    #[error("advance {id} has only {available} remaining to apply")]
    InsufficientAdvance { id: Uuid, available: Decimal },
    #[error("bill {id} is VOID or DRAFT and cannot accept an advance")]
    BillNotPayable { id: Uuid },
    #[error("applying this advance would overpay bill {bill_id}")]
    Overpayment { bill_id: Uuid },
    #[error(transparent)]
    Advance(#[from] VendorAdvanceError),
    #[error(transparent)]
    Bill(#[from] BillError),
    #[error(transparent)]
    Payment(#[from] ApPaymentError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
    #[error(transparent)]
    Outbox(#[from] event_bus::outbox::OutboxError),
}

pub struct PayVendorAdvanceInput {
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub paid_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub bank_account_code: String,
    pub closed_through_date: Option<NaiveDate>,
}

pub async fn pay_vendor_advance(
    tx: &mut Transaction<'_, Postgres>,
    input: PayVendorAdvanceInput,
) -> Result<VendorAdvance, VendorAdvanceServiceError> {
    if input.amount <= Decimal::ZERO {
        return Err(VendorAdvanceServiceError::InvalidAmount);
    }

    let event_id = Uuid::new_v4();
    let payload = GlPostingRequestV1 {
        posting_date: input.paid_date.format("%Y-%m-%d").to_string(),
        currency: input.currency.clone(),
        source_doc_type: SourceDocType::ArAdjustment,
        source_doc_id: event_id.to_string(),
        description: "Vendor advance paid".to_string(),
        lines: vec![
            JournalLine {
                account_ref: VENDOR_ADVANCE_ASSET_CODE.to_string(),
                debit: input.amount,
                credit: Decimal::ZERO,
                memo: Some("Vendor advance".to_string()),
                dimensions: None,
            },
            JournalLine {
                account_ref: input.bank_account_code.clone(),
                debit: Decimal::ZERO,
                credit: input.amount,
                memo: Some("Vendor advance".to_string()),
                dimensions: None,
            },
        ],
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

    let advance = vendor_advance_repo::insert(
        tx,
        NewVendorAdvance {
            tenant_id: input.tenant_id,
            vendor_id: input.vendor_id,
            paid_date: input.paid_date,
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
        "vendor_advance",
        advance.id,
        "ap.vendor_advance.issued.v1",
        1,
        &platform_contracts::VendorAdvanceIssuedV1 {
            advance_id: advance.id,
            tenant_id: input.tenant_id,
            vendor_id: input.vendor_id,
            amount: input.amount.to_string(),
        },
    )
    .await?;

    Ok(advance)
}

/// Applies part or all of an advance's remaining balance against a bill.
/// Posts no new GL entry: Dr Vendor Advance Asset / Cr Bank was already
/// recorded on payment; application only allocates it to a specific bill
/// and folds it into that bill's recomputed settled amount.
pub async fn apply_vendor_advance(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    advance_id: Uuid,
    bill_id: Uuid,
    amount: Decimal,
) -> Result<(), VendorAdvanceServiceError> {
    if amount <= Decimal::ZERO {
        return Err(VendorAdvanceServiceError::InvalidApplicationAmount);
    }

    let advance = vendor_advance_repo::lock_by_id(tx, tenant_id, advance_id).await?;
    let available = advance.amount - advance.amount_applied;
    if amount > available {
        return Err(VendorAdvanceServiceError::InsufficientAdvance {
            id: advance_id,
            available,
        });
    }

    let bill = bill_repo::find_by_id(&mut **tx, tenant_id, bill_id).await?;
    if !matches!(bill.status, BillStatus::Posted | BillStatus::Partial) {
        return Err(VendorAdvanceServiceError::BillNotPayable { id: bill_id });
    }

    let already_paid = bill_repo::recompute_amount_paid(&mut **tx, bill_id).await?;
    let new_total_paid = already_paid + amount;
    if new_total_paid > bill.total {
        return Err(VendorAdvanceServiceError::Overpayment { bill_id });
    }

    vendor_advance_repo::add_application_amount(tx, advance_id, amount).await?;
    vendor_advance_repo::insert_application(tx, tenant_id, advance_id, bill_id, amount).await?;

    let new_status = if new_total_paid >= bill.total {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    };
    bill_repo::update_amount_paid_and_status(tx, bill_id, new_total_paid, new_status).await?;

    Ok(())
}
