//! Canonical event and command contract conventions shared by every module
//! that publishes through `event-bus`'s outbox.
//!
//! The design note in the ledger core spec replaces runtime reflection and
//! dynamic payload shapes with a tagged enum dispatched on
//! `(eventType, schemaVersion)`. Each payload carries its own
//! `schema_version` so a consumer that only understands v1 can detect a v2
//! payload and dead-letter it instead of misparsing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use event_bus::EventEnvelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLineSummary {
    pub account_code: String,
    pub debit: String,
    pub credit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntryCreatedV1 {
    pub journal_entry_id: Uuid,
    pub tenant_id: Uuid,
    pub posting_date: chrono::NaiveDate,
    pub currency: String,
    pub source_module: String,
    pub source_document_type: String,
    pub source_document_id: Uuid,
    pub lines: Vec<JournalLineSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePostedV1 {
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub currency: String,
    pub total: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedV1 {
    pub payment_id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNoteIssuedV1 {
    pub credit_note_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecalcAdjustedV1 {
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub adjusting_journal_entry_id: Uuid,
    pub from_move_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceVoidedV1 {
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub reversal_journal_entry_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReversedV1 {
    pub payment_id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub reversal_journal_entry_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillPostedV1 {
    pub bill_id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub currency: String,
    pub total: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillPaymentRecordedV1 {
    pub payment_id: Uuid,
    pub tenant_id: Uuid,
    pub bill_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorCreditIssuedV1 {
    pub vendor_credit_id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAdvanceReceivedV1 {
    pub advance_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAdvanceIssuedV1 {
    pub advance_id: Uuid,
    pub tenant_id: Uuid,
    pub vendor_id: Uuid,
    pub amount: String,
}

/// Tagged dispatch over every event type a consumer may see on
/// `*.events.>`. Unknown `(event_type, schema_version)` pairs fail to
/// deserialize into this enum and should be dead-lettered by the consumer,
/// not best-effort parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "payload")]
pub enum DomainEvent {
    #[serde(rename = "journal.entry.created.v1")]
    JournalEntryCreatedV1(JournalEntryCreatedV1),
    #[serde(rename = "ar.invoice.posted.v1")]
    InvoicePostedV1(InvoicePostedV1),
    #[serde(rename = "ar.payment.recorded.v1")]
    PaymentRecordedV1(PaymentRecordedV1),
    #[serde(rename = "ar.credit_note.issued.v1")]
    CreditNoteIssuedV1(CreditNoteIssuedV1),
    #[serde(rename = "inventory.recalc.adjusted.v1")]
    InventoryRecalcAdjustedV1(InventoryRecalcAdjustedV1),
    #[serde(rename = "ar.invoice.voided.v1")]
    InvoiceVoidedV1(InvoiceVoidedV1),
    #[serde(rename = "ar.payment.reversed.v1")]
    PaymentReversedV1(PaymentReversedV1),
    #[serde(rename = "ap.bill.posted.v1")]
    BillPostedV1(BillPostedV1),
    #[serde(rename = "ap.payment.recorded.v1")]
    BillPaymentRecordedV1(BillPaymentRecordedV1),
    #[serde(rename = "ap.vendor_credit.issued.v1")]
    VendorCreditIssuedV1(VendorCreditIssuedV1),
    #[serde(rename = "ar.customer_advance.received.v1")]
    CustomerAdvanceReceivedV1(CustomerAdvanceReceivedV1),
    #[serde(rename = "ap.vendor_advance.issued.v1")]
    VendorAdvanceIssuedV1(VendorAdvanceIssuedV1),
}

impl DomainEvent {
    pub fn tenant_id(&self) -> Uuid {
        match self {
            DomainEvent::JournalEntryCreatedV1(e) => e.tenant_id,
            DomainEvent::InvoicePostedV1(e) => e.tenant_id,
            DomainEvent::PaymentRecordedV1(e) => e.tenant_id,
            DomainEvent::CreditNoteIssuedV1(e) => e.tenant_id,
            DomainEvent::InventoryRecalcAdjustedV1(e) => e.tenant_id,
            DomainEvent::InvoiceVoidedV1(e) => e.tenant_id,
            DomainEvent::PaymentReversedV1(e) => e.tenant_id,
            DomainEvent::BillPostedV1(e) => e.tenant_id,
            DomainEvent::BillPaymentRecordedV1(e) => e.tenant_id,
            DomainEvent::VendorCreditIssuedV1(e) => e.tenant_id,
            DomainEvent::CustomerAdvanceReceivedV1(e) => e.tenant_id,
            DomainEvent::VendorAdvanceIssuedV1(e) => e.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMeta {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}
