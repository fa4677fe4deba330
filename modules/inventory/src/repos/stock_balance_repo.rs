//! The WAC `StockBalance` projection: current `(qtyOnHand, avgUnitCost,
//! inventoryValue)` per `(tenant, location, item)`, kept in lockstep with
//! `stock_moves` under a row-level lock so concurrent moves at the same
//! location/item serialise on that row (spec §5 concurrency model).

use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, FromRow)]
pub struct StockBalance {
    pub qty_on_hand: Decimal,
    pub avg_unit_cost: Decimal,
    pub inventory_value: Decimal,
}

impl StockBalance {
    pub fn zero() -> Self {
        StockBalance {
            qty_on_hand: Decimal::ZERO,
            avg_unit_cost: Decimal::ZERO,
            inventory_value: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Error)]
pub enum StockBalanceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Locks and reads the current balance row, initializing it at zero if it
/// doesn't exist yet. The row-level lock is held for the rest of the
/// caller's transaction.
pub async fn lock_or_init(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
) -> Result<StockBalance, StockBalanceError> {
    sqlx::query(
        r#"
        INSERT INTO stock_balances (tenant_id, location_id, item_id, qty_on_hand, avg_unit_cost, inventory_value, updated_at)
        VALUES ($1, $2, $3, 0, 0, 0, now())
        ON CONFLICT (tenant_id, location_id, item_id) DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(location_id)
    .bind(item_id)
    .execute(&mut **tx)
    .await?;

    let balance = sqlx::query_as::<_, StockBalance>(
        r#"
        SELECT qty_on_hand, avg_unit_cost, inventory_value
        FROM stock_balances
        WHERE tenant_id = $1 AND location_id = $2 AND item_id = $3
        FOR UPDATE
        "#,
    )
    .bind(tenant_id)
    .bind(location_id)
    .bind(item_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(balance)
}

pub async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    location_id: Uuid,
    item_id: Uuid,
    balance: StockBalance,
) -> Result<(), StockBalanceError> {
    sqlx::query(
        r#"
        INSERT INTO stock_balances (tenant_id, location_id, item_id, qty_on_hand, avg_unit_cost, inventory_value, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (tenant_id, location_id, item_id)
        DO UPDATE SET qty_on_hand = $4, avg_unit_cost = $5, inventory_value = $6, updated_at = now()
        "#,
    )
    .bind(tenant_id)
    .bind(location_id)
    .bind(item_id)
    .bind(balance.qty_on_hand)
    .bind(balance.avg_unit_cost)
    .bind(balance.inventory_value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
