//! `RunInventoryRecalcForward` (spec §4.8): deterministic WAC replay
//! triggered whenever a move is inserted on/before the latest existing move
//! at its `(location, item)`. Also doubles as the live-move application path
//! — a freshly-dated move recalculated from its own baseline is just a
//! replay window of one.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::posting::{self, PostingError};
use gl_rs::repos::journal_repo;
use gl_rs::services::company_bootstrap_service::{COGS_CODE, INVENTORY_ASSET_CODE};

use crate::repos::stock_balance_repo::{self, StockBalance};
use crate::repos::stock_move_repo::{self, Direction};
use crate::repos::valuation_repo;
use crate::services::valuation_service;

#[derive(Debug, thiserror::Error)]
pub enum RecalcError {
    #[error(transparent)]
    StockMove(#[from] stock_move_repo::StockMoveError),
    #[error(transparent)]
    StockBalance(#[from] stock_balance_repo::StockBalanceError),
    #[error(transparent)]
    Valuation(#[from] valuation_repo::ValuationError),
    #[error(transparent)]
    Posting(#[from] PostingError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Default)]
pub struct RecalcOutcome {
    /// Compensating journal entries emitted, keyed by the source entry they adjust.
    pub compensating_entries: Vec<(Uuid, Uuid)>,
}

/// Runs the full C8 replay for one `(location, item)` starting at `from_date`
/// (clamped forward past `closed_through_date`), updating `stock_moves`'
/// recorded costs, upserting the final `StockBalance`, and emitting
/// compensating journal entries for any OUT move whose recomputed cost
/// diverged from what was last posted.
pub async fn run_inventory_recalc_forward(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
    from_date: NaiveDate,
    closed_through_date: Option<NaiveDate>,
    currency: &str,
) -> Result<RecalcOutcome, RecalcError> {
    let effective_from = match closed_through_date {
        Some(closed) if from_date <= closed => closed.succ_opt().unwrap_or(from_date),
        _ => from_date,
    };

    let (baseline_qty, baseline_value) =
        stock_move_repo::baseline_before(tx, tenant_id, location_id, item_id, effective_from).await?;
    let baseline_avg = if baseline_qty.is_zero() { Decimal::ZERO } else { baseline_value / baseline_qty };

    let mut running = StockBalance {
        qty_on_hand: baseline_qty,
        avg_unit_cost: baseline_avg,
        inventory_value: baseline_value,
    };

    let moves = stock_move_repo::load_ordered_range(tx, tenant_id, location_id, item_id, Some(effective_from), None).await?;

    // Per source journal entry: the fresh cumulative cost of all replayed
    // OUT moves that reference it. Compared against the last-posted
    // cumulative to derive this pass's incremental adjustment.
    let mut cumulative_cost_by_entry: HashMap<Uuid, Decimal> = HashMap::new();

    for mv in &moves {
        let applied = match (mv.direction, mv.is_void_like()) {
            (Direction::In, true) => valuation_service::apply_void_like_in(running, mv.quantity, mv.total_cost_applied),
            (Direction::In, false) => valuation_service::apply_in(running, mv.quantity, mv.unit_cost_applied),
            (Direction::Out, true) => valuation_service::apply_void_like_out(running, mv.quantity, mv.total_cost_applied),
            (Direction::Out, false) => {
                let desired = valuation_service::apply_out(running, mv.quantity);
                if desired.unit_cost_applied != mv.unit_cost_applied
                    || desired.total_cost_applied != mv.total_cost_applied
                {
                    stock_move_repo::update_costs(tx, mv.id, desired.unit_cost_applied, desired.total_cost_applied).await?;
                }
                if let Some(entry_id) = mv.journal_entry_id {
                    *cumulative_cost_by_entry.entry(entry_id).or_insert(Decimal::ZERO) += desired.total_cost_applied;
                }
                desired
            }
        };
        running = applied.balance;
    }

    stock_balance_repo::upsert(tx, tenant_id, location_id, item_id, running).await?;

    let mut outcome = RecalcOutcome::default();
    for (source_entry_id, new_cumulative_cogs) in cumulative_cost_by_entry {
        let last = valuation_repo::last_computed_cogs(tx, tenant_id, source_entry_id).await?;
        let delta = new_cumulative_cogs - last;
        if delta.is_zero() {
            continue;
        }
        let Some(source_date) = journal_repo::posting_date_tx(tx, source_entry_id).await? else {
            continue;
        };
        if let Some(closed) = closed_through_date {
            if source_date <= closed {
                tracing::warn!(
                    tenant_id, %source_entry_id, %source_date,
                    "suppressing compensating inventory entry into closed period"
                );
                continue;
            }
        }

        let compensating_id = emit_compensating_entry(
            tx,
            tenant_id,
            source_entry_id,
            source_date,
            closed_through_date,
            currency,
            delta,
        )
        .await?;
        valuation_repo::record_computed_cogs(tx, tenant_id, source_entry_id, new_cumulative_cogs).await?;
        outcome.compensating_entries.push((source_entry_id, compensating_id));
    }

    Ok(outcome)
}

/// Posts `Dr COGS / Cr Inventory` for a positive delta (cost increased) or
/// the swapped pair for a negative delta, dated inside the source entry's
/// own day per spec step 7.
async fn emit_compensating_entry(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    source_entry_id: Uuid,
    source_date: NaiveDate,
    closed_through_date: Option<NaiveDate>,
    currency: &str,
    delta: Decimal,
) -> Result<Uuid, PostingError> {
    let amount = money::Money::from_decimal(delta.abs()).inner();
    let (dr_account, cr_account) = if delta.is_sign_positive() {
        (COGS_CODE, INVENTORY_ASSET_CODE)
    } else {
        (INVENTORY_ASSET_CODE, COGS_CODE)
    };

    let payload = GlPostingRequestV1 {
        posting_date: source_date.format("%Y-%m-%d").to_string(),
        currency: currency.to_string(),
        source_doc_type: SourceDocType::InventoryIssue,
        source_doc_id: source_entry_id.to_string(),
        description: "Inventory recalculation: backdated-move cost adjustment".to_string(),
        lines: vec![
            JournalLine { account_ref: dr_account.to_string(), debit: amount, credit: Decimal::ZERO, memo: None, dimensions: None },
            JournalLine { account_ref: cr_account.to_string(), debit: Decimal::ZERO, credit: amount, memo: None, dimensions: None },
        ],
    };

    posting::post_journal_entry_with_causation(
        tx,
        tenant_id,
        closed_through_date,
        "inventory",
        Uuid::new_v4(),
        &format!("inventory-recalc:{tenant_id}:{source_entry_id}"),
        Some(source_entry_id),
        &payload,
    )
    .await
}
