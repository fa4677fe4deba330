//! `StockMove`: the append-only audit log every WAC calculation replays
//! (spec §3, §4.8).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "stock_move_direction", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StockMove {
    pub id: Uuid,
    pub tenant_id: String,
    pub move_date: NaiveDate,
    pub location_id: Uuid,
    pub item_id: Uuid,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost_applied: Decimal,
    pub total_cost_applied: Decimal,
    pub reference_type: String,
    pub reference_id: String,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockMove {
    /// Moves whose `referenceType` ends in `Void` preserve their historical
    /// cost on replay rather than being re-priced at the current average.
    pub fn is_void_like(&self) -> bool {
        self.reference_type.ends_with("Void")
    }
}

#[derive(Debug, Error)]
pub enum StockMoveError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewStockMove {
    pub id: Uuid,
    pub tenant_id: String,
    pub move_date: NaiveDate,
    pub location_id: Uuid,
    pub item_id: Uuid,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost_applied: Decimal,
    pub total_cost_applied: Decimal,
    pub reference_type: String,
    pub reference_id: String,
    pub journal_entry_id: Option<Uuid>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    mv: NewStockMove,
) -> Result<StockMove, StockMoveError> {
    let row = sqlx::query_as::<_, StockMove>(
        r#"
        INSERT INTO stock_moves
            (id, tenant_id, move_date, location_id, item_id, direction, quantity,
             unit_cost_applied, total_cost_applied, reference_type, reference_id,
             journal_entry_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
        RETURNING id, tenant_id, move_date, location_id, item_id, direction, quantity,
                  unit_cost_applied, total_cost_applied, reference_type, reference_id,
                  journal_entry_id, created_at
        "#,
    )
    .bind(mv.id)
    .bind(&mv.tenant_id)
    .bind(mv.move_date)
    .bind(mv.location_id)
    .bind(mv.item_id)
    .bind(mv.direction)
    .bind(mv.quantity)
    .bind(mv.unit_cost_applied)
    .bind(mv.total_cost_applied)
    .bind(&mv.reference_type)
    .bind(&mv.reference_id)
    .bind(mv.journal_entry_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// The latest move's date at `(location, item)`, used to decide whether an
/// incoming move is backdated and a recalc must run.
pub async fn latest_move_date(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
) -> Result<Option<NaiveDate>, StockMoveError> {
    let row: Option<(NaiveDate,)> = sqlx::query_as(
        "SELECT move_date FROM stock_moves
         WHERE tenant_id = $1 AND location_id = $2 AND item_id = $3
         ORDER BY move_date DESC, id DESC LIMIT 1",
    )
    .bind(tenant_id)
    .bind(location_id)
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(d,)| d))
}

/// Baseline `(qty, value)` strictly before `from_date`, step 2 of
/// `RunInventoryRecalcForward`.
pub async fn baseline_before(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
    from_date: NaiveDate,
) -> Result<(Decimal, Decimal), StockMoveError> {
    let moves = load_ordered_range(tx, tenant_id, location_id, item_id, None, Some(from_date)).await?;
    let mut qty = Decimal::ZERO;
    let mut value = Decimal::ZERO;
    for mv in moves {
        match mv.direction {
            Direction::In => {
                qty += mv.quantity;
                value += mv.total_cost_applied;
            }
            Direction::Out => {
                qty -= mv.quantity;
                value -= mv.total_cost_applied;
            }
        }
    }
    Ok((qty, value))
}

/// All moves at `(location, item)` in `(date ASC, id ASC)` order, optionally
/// bounded. `before` is exclusive; the recalc's forward pass uses `from`
/// inclusive.
pub async fn load_ordered_range(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
    from: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> Result<Vec<StockMove>, StockMoveError> {
    let rows = sqlx::query_as::<_, StockMove>(
        r#"
        SELECT id, tenant_id, move_date, location_id, item_id, direction, quantity,
               unit_cost_applied, total_cost_applied, reference_type, reference_id,
               journal_entry_id, created_at
        FROM stock_moves
        WHERE tenant_id = $1 AND location_id = $2 AND item_id = $3
          AND ($4::date IS NULL OR move_date >= $4)
          AND ($5::date IS NULL OR move_date < $5)
        ORDER BY move_date ASC, id ASC
        "#,
    )
    .bind(tenant_id)
    .bind(location_id)
    .bind(item_id)
    .bind(from)
    .bind(before)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Backfills `journal_entry_id` onto a move recorded before its document's
/// own journal entry existed (the AR/AP posting flows build the GL payload
/// from the move's accumulated cost, so the move is written first). Without
/// this link a later backdated recalc has no entry to attach a compensating
/// adjustment to.
pub async fn attach_journal_entry(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    journal_entry_id: Uuid,
) -> Result<(), StockMoveError> {
    sqlx::query("UPDATE stock_moves SET journal_entry_id = $2 WHERE id = $1")
        .bind(id)
        .bind(journal_entry_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Updates a replayed OUT move's recorded cost fields in place (step 5 of
/// `RunInventoryRecalcForward`).
pub async fn update_costs(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    unit_cost_applied: Decimal,
    total_cost_applied: Decimal,
) -> Result<(), StockMoveError> {
    sqlx::query(
        "UPDATE stock_moves SET unit_cost_applied = $2, total_cost_applied = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(unit_cost_applied)
    .bind(total_cost_applied)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
