//! GL Posting Request V1 Contract Types
//!
//! These types match the JSON schema defined in:
//! contracts/events/gl-posting-request.v1.json
//!
//! IMPORTANT: Field names must match the JSON schema EXACTLY (case-sensitive).
//! Do not add validations beyond what's in the schema.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payload for GL posting request event
///
/// This is the payload type used with `EventEnvelope<GlPostingRequestV1>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlPostingRequestV1 {
    /// Accounting date for the journal entry (YYYY-MM-DD)
    pub posting_date: String,

    /// ISO 4217 currency code (e.g., "USD", "EUR")
    pub currency: String,

    /// Document type that originated this posting
    pub source_doc_type: SourceDocType,

    /// Unique identifier of the source document in the originating module
    pub source_doc_id: String,

    /// Human-readable description for the journal entry (1-500 chars)
    pub description: String,

    /// Journal entry lines (must have at least 2 items)
    pub lines: Vec<JournalLine>,
}

/// Source document types that can generate GL postings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceDocType {
    ArInvoice,
    ArPayment,
    ArCreditMemo,
    ArAdjustment,
    ApBill,
    ApPayment,
    InventoryReceipt,
    InventoryIssue,
    PayrollRun,
}

/// A single line in a journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalLine {
    /// Reference to account in the GL chart of accounts
    pub account_ref: String,

    /// Debit amount (must be >= 0), transported as a decimal string so
    /// precision survives the wire — see `money::Money`.
    pub debit: Decimal,

    /// Credit amount (must be >= 0)
    pub credit: Decimal,

    /// Optional line-level memo (<= 500 chars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// Optional analytical dimensions for reporting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// Analytical dimensions for reporting and analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    /// Customer identifier for AR-related postings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// Vendor identifier for AP-related postings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    /// Location or branch identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,

    /// Job or project work order identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Department code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// Classification dimension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Project identifier for project accounting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}
