//! HTTP routes for item master data and stock-balance lookups.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::item_repo::{Item, ItemError, ItemType};
use crate::services::item_service::{self, CreateItemRequest};

fn item_error_response(err: ItemError) -> Response {
    let status = match &err {
        ItemError::NotFound { .. } => StatusCode::NOT_FOUND,
        ItemError::DuplicateSku { .. } => StatusCode::CONFLICT,
        ItemError::EmptyName => StatusCode::BAD_REQUEST,
        ItemError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorBody { error: err.to_string() })).into_response()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
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

pub async fn create_item(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<String>,
    Json(body): Json<CreateItemBody>,
) -> Result<Json<Item>, Response> {
    let item = item_service::create_item(
        &pool,
        CreateItemRequest {
            tenant_id,
            name: body.name,
            sku: body.sku,
            item_type: body.item_type,
            selling_price: body.selling_price,
            cost_price: body.cost_price,
            track_inventory: body.track_inventory,
            income_account_code: body.income_account_code,
            expense_account_code: body.expense_account_code,
            default_location_id: body.default_location_id,
        },
    )
    .await
    .map_err(item_error_response)?;
    Ok(Json(item))
}

pub async fn list_items(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Item>>, Response> {
    let items = item_service::list_items(&pool, &tenant_id)
        .await
        .map_err(item_error_response)?;
    Ok(Json(items))
}

pub async fn get_item(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(String, Uuid)>,
) -> Result<Json<Item>, Response> {
    let item = item_service::get_item(&pool, &tenant_id, id)
        .await
        .map_err(item_error_response)?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
pub struct StockBalanceQuery {
    pub location_id: Uuid,
    pub item_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StockBalanceResponse {
    pub qty_on_hand: Decimal,
    pub avg_unit_cost: Decimal,
    pub inventory_value: Decimal,
}

pub async fn get_stock_balance(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<String>,
    Query(q): Query<StockBalanceQuery>,
) -> Result<Json<StockBalanceResponse>, Response> {
    let row: Option<(Decimal, Decimal, Decimal)> = sqlx::query_as(
        "SELECT qty_on_hand, avg_unit_cost, inventory_value FROM stock_balances
         WHERE tenant_id = $1 AND location_id = $2 AND item_id = $3",
    )
    .bind(&tenant_id)
    .bind(q.location_id)
    .bind(q.item_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|_| {
        (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody { error: "a downstream resource is unavailable".to_string() })).into_response()
    })?;

    let (qty_on_hand, avg_unit_cost, inventory_value) = row.unwrap_or((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
    Ok(Json(StockBalanceResponse { qty_on_hand, avg_unit_cost, inventory_value }))
}
