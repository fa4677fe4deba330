//! Document-driven stock moves: the entry point `ar`, `ap`, and
//! `integrations` call when posting an inventory-tracked line. Inserts the
//! `StockMove` row, then always runs the C8 recalc forward from that move's
//! date — for an in-order move this degenerates to applying just the one
//! move against its own baseline; for a backdated one it replays everything
//! after it and emits compensating entries where costs diverged.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::stock_move_repo::{self, Direction, NewStockMove, StockMove};
use crate::services::recalc_service::{self, RecalcError, RecalcOutcome};

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error(transparent)]
    StockMove(#[from] stock_move_repo::StockMoveError),
    #[error(transparent)]
    Recalc(#[from] RecalcError),
}

/// Cost basis for a newly recorded move.
pub enum MoveCost {
    /// An IN move's unit cost, supplied by the originating document (a
    /// purchase bill's line cost).
    Supplied(Decimal),
    /// An OUT move costed at whatever the current average turns out to be
    /// once the recalc replay reaches it — the common sale path.
    CurrentAverage,
    /// A void-like move (`referenceType` ending in `Void`) that preserves
    /// the exact cost of the move it reverses.
    Preserved { unit_cost: Decimal, total_cost: Decimal },
}

#[derive(Debug, Clone)]
pub struct RecordMoveRequest {
    pub tenant_id: String,
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub direction: Direction,
    pub move_date: NaiveDate,
    pub quantity: Decimal,
    pub reference_type: String,
    pub reference_id: String,
    pub journal_entry_id: Option<Uuid>,
}

pub struct RecordedMove {
    pub stock_move: StockMove,
    pub recalc: RecalcOutcome,
}

#[allow(clippy::too_many_arguments)]
pub async fn record_move(
    tx: &mut Transaction<'_, Postgres>,
    req: RecordMoveRequest,
    cost: MoveCost,
    closed_through_date: Option<NaiveDate>,
    currency: &str,
) -> Result<RecordedMove, MoveError> {
    let (unit_cost_applied, total_cost_applied) = match &cost {
        MoveCost::Supplied(unit_cost) => {
            let total = money::Money::from_decimal(req.quantity * unit_cost).inner();
            (*unit_cost, total)
        }
        // Provisional only: the recalc pass below always replays this move
        // from its own baseline and overwrites these with the true average.
        MoveCost::CurrentAverage => (Decimal::ZERO, Decimal::ZERO),
        MoveCost::Preserved { unit_cost, total_cost } => (*unit_cost, *total_cost),
    };

    let stock_move = stock_move_repo::insert(
        tx,
        NewStockMove {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id.clone(),
            move_date: req.move_date,
            location_id: req.location_id,
            item_id: req.item_id,
            direction: req.direction,
            quantity: req.quantity,
            unit_cost_applied,
            total_cost_applied,
            reference_type: req.reference_type,
            reference_id: req.reference_id,
            journal_entry_id: req.journal_entry_id,
        },
    )
    .await?;

    let recalc = recalc_service::run_inventory_recalc_forward(
        tx,
        &req.tenant_id,
        req.location_id,
        req.item_id,
        req.move_date,
        closed_through_date,
        currency,
    )
    .await?;

    // Re-read the move: the recalc pass may have corrected its cost fields.
    let moves = stock_move_repo::load_ordered_range(
        tx,
        &req.tenant_id,
        req.location_id,
        req.item_id,
        Some(req.move_date),
        None,
    )
    .await?;
    let stock_move = moves
        .into_iter()
        .find(|m| m.id == stock_move.id)
        .unwrap_or(stock_move);

    Ok(RecordedMove { stock_move, recalc })
}
