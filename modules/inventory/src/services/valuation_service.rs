//! Pure Weighted-Average-Cost arithmetic (spec §4.8). Kept free of I/O so
//! both the live move path and the backdated recalc replay share exactly one
//! implementation of the formulas.

use rust_decimal::Decimal;

use crate::repos::stock_balance_repo::StockBalance;

/// Result of applying one move to a balance: the new balance plus the
/// `(unitCostApplied, totalCostApplied)` actually recorded against the move.
#[derive(Debug, Clone, Copy)]
pub struct AppliedMove {
    pub balance: StockBalance,
    pub unit_cost_applied: Decimal,
    pub total_cost_applied: Decimal,
}

/// `newQty = qty + moveQty; newValue = value + moveTotal; newAvg = newValue / newQty`.
/// `unit_cost` is the caller-supplied cost (a bill's line cost, or a void-like
/// move's preserved historical cost); `moveTotal` is always recomputed from
/// it rather than trusted as a separate input, matching spec wording
/// ("moveTotal") while keeping one source of truth for the relationship.
pub fn apply_in(balance: StockBalance, move_qty: Decimal, unit_cost: Decimal) -> AppliedMove {
    let move_total = money::Money::from_decimal(move_qty * unit_cost).inner();
    let new_qty = balance.qty_on_hand + move_qty;
    let new_value = balance.inventory_value + move_total;
    let new_avg = if new_qty.is_zero() {
        Decimal::ZERO
    } else {
        new_value / new_qty
    };
    AppliedMove {
        balance: StockBalance {
            qty_on_hand: new_qty,
            avg_unit_cost: new_avg,
            inventory_value: new_value,
        },
        unit_cost_applied: unit_cost,
        total_cost_applied: move_total,
    }
}

/// `moveUnitCost = currentAvg; moveTotal = moveQty * currentAvg; newQty =
/// qty - moveQty; newValue = value - moveTotal`; average unchanged while
/// `qty > 0` after the move, else reset to zero per spec.
pub fn apply_out(balance: StockBalance, move_qty: Decimal) -> AppliedMove {
    let unit_cost = balance.avg_unit_cost;
    let move_total = money::Money::from_decimal(move_qty * unit_cost).inner();
    let new_qty = balance.qty_on_hand - move_qty;
    let new_value = balance.inventory_value - move_total;
    let new_avg = if new_qty.is_zero() { Decimal::ZERO } else { balance.avg_unit_cost };
    AppliedMove {
        balance: StockBalance {
            qty_on_hand: new_qty,
            avg_unit_cost: new_avg,
            inventory_value: new_value,
        },
        unit_cost_applied: unit_cost,
        total_cost_applied: move_total,
    }
}

/// A void-like OUT/IN move (referenceType ending in `Void`) preserves its
/// originally recorded cost rather than being re-priced — it still adjusts
/// quantity and value by the stored amount.
pub fn apply_void_like_out(balance: StockBalance, move_qty: Decimal, preserved_total: Decimal) -> AppliedMove {
    let new_qty = balance.qty_on_hand - move_qty;
    let new_value = balance.inventory_value - preserved_total;
    let new_avg = if new_qty.is_zero() { Decimal::ZERO } else { balance.avg_unit_cost };
    AppliedMove {
        balance: StockBalance {
            qty_on_hand: new_qty,
            avg_unit_cost: new_avg,
            inventory_value: new_value,
        },
        unit_cost_applied: if move_qty.is_zero() { Decimal::ZERO } else { preserved_total / move_qty },
        total_cost_applied: preserved_total,
    }
}

pub fn apply_void_like_in(balance: StockBalance, move_qty: Decimal, preserved_total: Decimal) -> AppliedMove {
    let new_qty = balance.qty_on_hand + move_qty;
    let new_value = balance.inventory_value + preserved_total;
    let new_avg = if new_qty.is_zero() { Decimal::ZERO } else { new_value / new_qty };
    AppliedMove {
        balance: StockBalance {
            qty_on_hand: new_qty,
            avg_unit_cost: new_avg,
            inventory_value: new_value,
        },
        unit_cost_applied: if move_qty.is_zero() { Decimal::ZERO } else { preserved_total / move_qty },
        total_cost_applied: preserved_total,
    }
}
