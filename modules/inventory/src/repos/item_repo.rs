//! Item master data (spec §3 `Item`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "item_type", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Goods,
    Service,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: Uuid,
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
    pub valuation_method: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("item not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: String, id: Uuid },
    #[error("name must not be empty")]
    EmptyName,
    #[error("sku '{sku}' already exists for tenant {tenant_id}")]
    DuplicateSku { tenant_id: String, sku: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewItem {
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

pub async fn insert(pool: &PgPool, item: NewItem) -> Result<Item, ItemError> {
    if item.name.trim().is_empty() {
        return Err(ItemError::EmptyName);
    }
    let id = Uuid::new_v4();
    let row = sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items
            (id, tenant_id, name, sku, item_type, selling_price, cost_price,
             track_inventory, income_account_code, expense_account_code,
             default_location_id, valuation_method, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'WAC', now())
        RETURNING id, tenant_id, name, sku, item_type, selling_price, cost_price,
                  track_inventory, income_account_code, expense_account_code,
                  default_location_id, valuation_method, created_at
        "#,
    )
    .bind(id)
    .bind(&item.tenant_id)
    .bind(&item.name)
    .bind(&item.sku)
    .bind(item.item_type)
    .bind(item.selling_price)
    .bind(item.cost_price)
    .bind(item.track_inventory)
    .bind(&item.income_account_code)
    .bind(&item.expense_account_code)
    .bind(item.default_location_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ItemError::DuplicateSku {
            tenant_id: item.tenant_id.clone(),
            sku: item.sku.clone().unwrap_or_default(),
        },
        _ => ItemError::Database(e),
    })?;
    Ok(row)
}

pub async fn find_by_id(pool: &PgPool, tenant_id: &str, id: Uuid) -> Result<Item, ItemError> {
    find_by_id_opt(pool, tenant_id, id)
        .await?
        .ok_or_else(|| ItemError::NotFound {
            tenant_id: tenant_id.to_string(),
            id,
        })
}

pub async fn find_by_id_opt(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
) -> Result<Option<Item>, ItemError> {
    let item = sqlx::query_as::<_, Item>(
        "SELECT id, tenant_id, name, sku, item_type, selling_price, cost_price,
                track_inventory, income_account_code, expense_account_code,
                default_location_id, valuation_method, created_at
         FROM items WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<Item, ItemError> {
    let item = sqlx::query_as::<_, Item>(
        "SELECT id, tenant_id, name, sku, item_type, selling_price, cost_price,
                track_inventory, income_account_code, expense_account_code,
                default_location_id, valuation_method, created_at
         FROM items WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    item.ok_or_else(|| ItemError::NotFound {
        tenant_id: tenant_id.to_string(),
        id,
    })
}

pub async fn find_by_sku(
    pool: &PgPool,
    tenant_id: &str,
    sku: &str,
) -> Result<Option<Item>, ItemError> {
    let item = sqlx::query_as::<_, Item>(
        "SELECT id, tenant_id, name, sku, item_type, selling_price, cost_price,
                track_inventory, income_account_code, expense_account_code,
                default_location_id, valuation_method, created_at
         FROM items WHERE tenant_id = $1 AND sku = $2",
    )
    .bind(tenant_id)
    .bind(sku)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

pub async fn list(pool: &PgPool, tenant_id: &str) -> Result<Vec<Item>, ItemError> {
    let items = sqlx::query_as::<_, Item>(
        "SELECT id, tenant_id, name, sku, item_type, selling_price, cost_price,
                track_inventory, income_account_code, expense_account_code,
                default_location_id, valuation_method, created_at
         FROM items WHERE tenant_id = $1 ORDER BY name ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Resolves the external-POS import's auto-create contract (C9): find by
/// `sku` first, and only create a new, never-tracked item when it's absent.
pub async fn find_or_create_untracked_by_sku(
    pool: &PgPool,
    tenant_id: &str,
    name: &str,
    sku: &str,
    selling_price: Decimal,
    income_account_code: &str,
) -> Result<Item, ItemError> {
    if let Some(existing) = find_by_sku(pool, tenant_id, sku).await? {
        return Ok(existing);
    }
    insert(
        pool,
        NewItem {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            sku: Some(sku.to_string()),
            item_type: ItemType::Goods,
            selling_price,
            cost_price: None,
            track_inventory: false,
            income_account_code: income_account_code.to_string(),
            expense_account_code: None,
            default_location_id: None,
        },
    )
    .await
}

pub async fn set_default_location(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
    location_id: Uuid,
) -> Result<(), ItemError> {
    let result = sqlx::query(
        "UPDATE items SET default_location_id = $3 WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .bind(location_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ItemError::NotFound {
            tenant_id: tenant_id.to_string(),
            id,
        });
    }
    Ok(())
}
