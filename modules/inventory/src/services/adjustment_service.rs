//! Direct stock adjustment (spec §6 `POST /companies/{t}/inventory/adjustments`):
//! a count correction or shrinkage write-off that isn't driven by an AR/AP
//! document. Still composes `move_service::record_move` and `gl_rs::posting`
//! inside the caller's transaction like every other C8 entry point — an
//! inventory value change always carries a balancing GL entry.

use chrono::NaiveDate;
use gl_rs::contracts::gl_posting_request_v1::{GlPostingRequestV1, JournalLine, SourceDocType};
use gl_rs::services::company_bootstrap_service::{COGS_CODE, INVENTORY_ASSET_CODE};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repos::item_repo::{self, ItemError};
use crate::repos::stock_move_repo::Direction;
use crate::services::location_service::{self, LocationResolutionError};
use crate::services::move_service::{self, MoveCost, RecordMoveRequest};

#[derive(Debug, thiserror::Error)]
pub enum AdjustmentError {
    #[error("adjustment quantity must be greater than zero")]
    InvalidQuantity,
    #[error("unit_cost is required for an IN adjustment")]
    MissingUnitCost,
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Location(#[from] LocationResolutionError),
    #[error(transparent)]
    Move(#[from] move_service::MoveError),
    #[error(transparent)]
    Posting(#[from] gl_rs::posting::PostingError),
}

pub struct AdjustStockInput {
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub location_id: Option<Uuid>,
    pub direction: Direction,
    pub quantity: Decimal,
    /// Unit cost for an IN adjustment (a found/returned count correction);
    /// ignored for OUT, which is always costed at the current average like
    /// any other issue.
    pub unit_cost: Option<Decimal>,
    pub adjustment_date: NaiveDate,
    pub currency: String,
    pub reason: String,
}

pub struct AdjustedStock {
    pub stock_move_id: Uuid,
    pub journal_entry_id: Uuid,
}

pub async fn adjust_stock(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    input: AdjustStockInput,
    closed_through_date: Option<NaiveDate>,
) -> Result<AdjustedStock, AdjustmentError> {
    if input.quantity <= Decimal::ZERO {
        return Err(AdjustmentError::InvalidQuantity);
    }

    let tenant_id_str = input.tenant_id.to_string();
    let item = item_repo::find_by_id_tx(tx, &tenant_id_str, input.item_id).await?;
    let location_id = location_service::resolve_location(pool, &tenant_id_str, &item, input.location_id)
        .await?
        .expect("inventory adjustments only run against inventory-tracked items");

    let cost = match input.direction {
        Direction::In => {
            let unit_cost = input.unit_cost.ok_or(AdjustmentError::MissingUnitCost)?;
            MoveCost::Supplied(unit_cost)
        }
        Direction::Out => MoveCost::CurrentAverage,
    };

    let currency = input.currency.clone();
    let reference_id = Uuid::new_v4().to_string();

    let recorded = move_service::record_move(
        tx,
        RecordMoveRequest {
            tenant_id: tenant_id_str.clone(),
            item_id: item.id,
            location_id,
            direction: input.direction,
            move_date: input.adjustment_date,
            quantity: input.quantity,
            reference_type: "InventoryAdjustment".to_string(),
            reference_id: reference_id.clone(),
            journal_entry_id: None,
        },
        cost,
        closed_through_date,
        &currency,
    )
    .await?;

    let amount = recorded.stock_move.total_cost_applied;
    let (source_doc_type, lines) = match input.direction {
        Direction::In => (
            SourceDocType::InventoryReceipt,
            vec![
                JournalLine {
                    account_ref: INVENTORY_ASSET_CODE.to_string(),
                    debit: amount,
                    credit: Decimal::ZERO,
                    memo: Some(input.reason.clone()),
                    dimensions: None,
                },
                JournalLine {
                    account_ref: COGS_CODE.to_string(),
                    debit: Decimal::ZERO,
                    credit: amount,
                    memo: Some(input.reason.clone()),
                    dimensions: None,
                },
            ],
        ),
        Direction::Out => (
            SourceDocType::InventoryIssue,
            vec![
                JournalLine {
                    account_ref: COGS_CODE.to_string(),
                    debit: amount,
                    credit: Decimal::ZERO,
                    memo: Some(input.reason.clone()),
                    dimensions: None,
                },
                JournalLine {
                    account_ref: INVENTORY_ASSET_CODE.to_string(),
                    debit: Decimal::ZERO,
                    credit: amount,
                    memo: Some(input.reason.clone()),
                    dimensions: None,
                },
            ],
        ),
    };

    let payload = GlPostingRequestV1 {
        posting_date: input.adjustment_date.format("%Y-%m-%d").to_string(),
        currency,
        source_doc_type,
        source_doc_id: reference_id.clone(),
        description: format!("Inventory adjustment: {}", input.reason),
        lines,
    };

    let journal_entry_id = gl_rs::posting::post_journal_entry(
        tx,
        &tenant_id_str,
        closed_through_date,
        "inventory",
        Uuid::new_v4(),
        &reference_id,
        &payload,
    )
    .await?;

    crate::repos::stock_move_repo::attach_journal_entry(tx, recorded.stock_move.id, journal_entry_id)
        .await
        .map_err(move_service::MoveError::from)?;

    Ok(AdjustedStock {
        stock_move_id: recorded.stock_move.id,
        journal_entry_id,
    })
}
