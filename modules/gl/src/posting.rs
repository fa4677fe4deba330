//! Synchronous, same-transaction journal posting.
//!
//! The event-driven path in `consumer::gl_posting_consumer` still exists for
//! posting requests that genuinely arrive as events (external/batch
//! integrations), but `ar`, `ap`, `inventory`, and `integrations` call
//! [`post_journal_entry`] directly from inside their own transaction so a
//! posted invoice/bill/receipt and its journal entry commit or roll back
//! together. See `DESIGN.md` Open Question decision 4.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine};
use crate::repos::journal_repo;
use crate::services::balance_deltas::JournalLineInput;
use crate::services::balance_updater;
use crate::validation::{validate_accounts_against_coa, validate_gl_posting_request, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("posting date is closed: {0}")]
    PeriodClosed(#[from] tenant_registry::PeriodClosedError),
    #[error("invalid posting date: {0}")]
    InvalidDate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Posts a balanced journal entry within the caller's transaction and
/// returns the new entry id.
///
/// `closed_through_date` is the tenant's C12 cutoff (fetched by the caller
/// via `tenant_registry::closed_through_date`, outside this transaction or
/// within it); this function only enforces the invariant, it does not look
/// the tenant up, so `gl` never needs a `Uuid`-typed tenant id internally.
#[allow(clippy::too_many_arguments)]
pub async fn post_journal_entry(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    closed_through_date: Option<NaiveDate>,
    source_module: &str,
    source_event_id: Uuid,
    source_subject: &str,
    payload: &GlPostingRequestV1,
) -> Result<Uuid, PostingError> {
    post_journal_entry_with_causation(
        tx,
        tenant_id,
        closed_through_date,
        source_module,
        source_event_id,
        source_subject,
        None,
        payload,
    )
    .await
}

/// Same contract as [`post_journal_entry`], with an explicit `causation_id`
/// for the `journal.entry.created` outbox event (spec.md §3's OutboxEvent
/// row). Used by inventory's backdated recalc (spec.md §4.8 step 8) to link
/// a compensating entry back to the source journal entry it adjusts;
/// every other caller has no upstream event to point at and goes through
/// [`post_journal_entry`], which passes `None`.
#[allow(clippy::too_many_arguments)]
pub async fn post_journal_entry_with_causation(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    closed_through_date: Option<NaiveDate>,
    source_module: &str,
    source_event_id: Uuid,
    source_subject: &str,
    causation_id: Option<Uuid>,
    payload: &GlPostingRequestV1,
) -> Result<Uuid, PostingError> {
    validate_gl_posting_request(payload)?;
    validate_accounts_against_coa(tx, tenant_id, payload).await?;

    let posting_date = NaiveDate::parse_from_str(&payload.posting_date, "%Y-%m-%d")
        .map_err(|e| PostingError::InvalidDate(format!("{}: {}", payload.posting_date, e)))?;

    tenant_registry::assert_period_open(closed_through_date, posting_date)?;

    let posted_at: DateTime<Utc> = posting_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| PostingError::InvalidDate("invalid time".to_string()))?
        .and_utc();

    let entry_id = Uuid::new_v4();

    journal_repo::insert_entry(
        tx,
        entry_id,
        tenant_id,
        source_module,
        source_event_id,
        source_subject,
        posted_at,
        &payload.currency,
        Some(&payload.description),
        Some(&payload.source_doc_type.to_string()),
        Some(&payload.source_doc_id),
    )
    .await?;

    let line_inserts: Vec<journal_repo::JournalLineInsert> = payload
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| to_line_insert(line, idx))
        .collect();
    let delta_inputs: Vec<JournalLineInput> = line_inserts
        .iter()
        .map(|l| JournalLineInput {
            account_ref: l.account_ref.clone(),
            debit_minor: l.debit_minor,
            credit_minor: l.credit_minor,
        })
        .collect();

    journal_repo::bulk_insert_lines(tx, entry_id, line_inserts).await?;

    let period_id = period_marker_for(posting_date);
    balance_updater::update_balances_from_journal(
        tx,
        tenant_id,
        period_id,
        &payload.currency,
        entry_id,
        &delta_inputs,
    )
    .await
    .map_err(|e| PostingError::Database(sqlx::Error::Protocol(e.to_string())))?;

    emit_journal_entry_created(
        tx,
        tenant_id,
        entry_id,
        posting_date,
        source_module,
        source_event_id,
        source_subject,
        causation_id,
        payload,
    )
    .await?;

    Ok(entry_id)
}

/// Appends the `journal.entry.created` outbox event in the same transaction
/// as the entry itself, per C4's contract. `tenant_id` is parsed back to a
/// `Uuid` here only for the wire event — `gl`'s own storage stays `String`
/// per DESIGN.md Open Question decision 8. `source_subject` becomes the
/// event's `correlation_id` (spec.md §4.4: "new if absent" — callers that
/// pass an empty id get a fresh one); `causation_id` is forwarded as given.
#[allow(clippy::too_many_arguments)]
async fn emit_journal_entry_created(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    entry_id: Uuid,
    posting_date: NaiveDate,
    source_module: &str,
    source_event_id: Uuid,
    source_subject: &str,
    causation_id: Option<Uuid>,
    payload: &GlPostingRequestV1,
) -> Result<(), PostingError> {
    let event = platform_contracts::JournalEntryCreatedV1 {
        journal_entry_id: entry_id,
        tenant_id: tenant_id
            .parse()
            .map_err(|_| PostingError::InvalidDate(format!("tenant_id is not a uuid: {tenant_id}")))?,
        posting_date,
        currency: payload.currency.clone(),
        source_module: source_module.to_string(),
        source_document_type: payload.source_doc_type.to_string(),
        source_document_id: payload.source_doc_id.parse().unwrap_or(source_event_id),
        lines: payload
            .lines
            .iter()
            .map(|l| platform_contracts::JournalLineSummary {
                account_code: l.account_ref.clone(),
                debit: l.debit.to_string(),
                credit: l.credit.to_string(),
            })
            .collect(),
    };

    let correlation_id = (!source_subject.is_empty()).then(|| source_subject.to_string());
    event_bus::outbox::enqueue_correlated(
        tx,
        Some(event.tenant_id),
        "journal_entry",
        entry_id,
        "journal.entry.created",
        1,
        source_module,
        correlation_id,
        causation_id.map(|id| id.to_string()),
        &event,
    )
    .await
    .map_err(|e| PostingError::Database(sqlx::Error::Protocol(e.to_string())))?;

    Ok(())
}

fn to_line_insert(line: &JournalLine, idx: usize) -> journal_repo::JournalLineInsert {
    journal_repo::JournalLineInsert {
        id: Uuid::new_v4(),
        line_no: (idx + 1) as i32,
        account_ref: line.account_ref.clone(),
        debit_minor: money::Money::from_decimal(line.debit).to_minor_units(),
        credit_minor: money::Money::from_decimal(line.credit).to_minor_units(),
        memo: line.memo.clone(),
    }
}

/// `balance_updater` groups rollups by a `period_id`; callers outside the
/// `accounting_periods` table (ar/ap/inventory) have no period row to point
/// at, so derive a deterministic v5 UUID from the posting month instead of
/// requiring one. This keeps monthly rollups grouped consistently without
/// forcing every caller to pre-create a period row.
fn period_marker_for(date: NaiveDate) -> Uuid {
    let month_key = date.format("%Y-%m").to_string();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, month_key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_marker_is_stable_per_month() {
        let a = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(period_marker_for(a), period_marker_for(b));
    }

    #[test]
    fn period_marker_differs_across_months() {
        let a = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_ne!(period_marker_for(a), period_marker_for(b));
    }
}
