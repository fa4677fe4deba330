//! Item master-data service: thin validation layer over `item_repo`.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::item_repo::{self, Item, ItemError, ItemType, NewItem};

#[derive(Debug, Clone)]
pub struct CreateItemRequest {
    pub tenant_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub item_type: ItemType,
    pub selling_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub track_inventory: bool,
    pub income_account_code: String,
    pub expense_account_code: Option<String>,
    pub default_location_id: Option<Uuid>,
}

pub async fn create_item(pool: &PgPool, req: CreateItemRequest) -> Result<Item, ItemError> {
    item_repo::insert(
        pool,
        NewItem {
            tenant_id: req.tenant_id,
            name: req.name,
            sku: req.sku,
            item_type: req.item_type,
            selling_price: req.selling_price,
            cost_price: req.cost_price,
            track_inventory: req.track_inventory,
            income_account_code: req.income_account_code,
            expense_account_code: req.expense_account_code,
            default_location_id: req.default_location_id,
        },
    )
    .await
}

pub async fn get_item(pool: &PgPool, tenant_id: &str, id: Uuid) -> Result<Item, ItemError> {
    item_repo::find_by_id(pool, tenant_id, id).await
}

pub async fn list_items(pool: &PgPool, tenant_id: &str) -> Result<Vec<Item>, ItemError> {
    item_repo::list(pool, tenant_id).await
}
