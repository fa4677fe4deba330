//! Shared plumbing for the scenario and property tests in this crate.
//!
//! Everything here runs against a single real Postgres instance the way
//! `modules/gl`'s own E2E suite does (`get_test_pool`'s singleton `OnceCell`
//! pattern lives in `erp_invariant_tests`, not duplicated here); this module
//! only adds the item/account helpers specific to driving AR/inventory
//! scenarios end to end.

use inventory_rs::repos::item_repo::{self, Item, ItemType, NewItem};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub use erp_invariant_tests::{cleanup_tenant, get_test_pool, seed_tenant, setup_test_period, TestTenant};

/// A non-inventory-tracked item posting straight to `income_account_code`,
/// the shape S1's cash sale line needs.
pub async fn seed_service_item(pool: &PgPool, tenant_id: Uuid, income_account_code: &str) -> Item {
    item_repo::insert(
        pool,
        NewItem {
            tenant_id: tenant_id.to_string(),
            name: "Consulting hour".to_string(),
            sku: None,
            item_type: ItemType::Service,
            selling_price: Decimal::new(1000, 0),
            cost_price: None,
            track_inventory: false,
            income_account_code: income_account_code.to_string(),
            expense_account_code: None,
            default_location_id: None,
        },
    )
    .await
    .expect("failed to seed service item")
}

/// A tracked item with a fixed default location, for S2's WAC scenario.
pub async fn seed_tracked_item(
    pool: &PgPool,
    tenant_id: Uuid,
    income_account_code: &str,
    expense_account_code: &str,
) -> (Item, Uuid) {
    let location_id = Uuid::new_v4();
    let item = item_repo::insert(
        pool,
        NewItem {
            tenant_id: tenant_id.to_string(),
            name: "Widget".to_string(),
            sku: Some(format!("WIDGET-{location_id}")),
            item_type: ItemType::Goods,
            selling_price: Decimal::new(30000, 2),
            cost_price: None,
            track_inventory: true,
            income_account_code: income_account_code.to_string(),
            expense_account_code: Some(expense_account_code.to_string()),
            default_location_id: Some(location_id),
        },
    )
    .await
    .expect("failed to seed tracked item");
    (item, location_id)
}
