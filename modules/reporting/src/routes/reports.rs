//! Pure-read report endpoints (C13). Every handler here takes only a
//! `tenant_id` path segment plus query parameters — there is nothing to
//! idempotency-wrap because nothing here writes.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use platform_http_contracts::ApiError;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::account_activity_repo::{self, AccountActivityError, AccountActivityReport};
use crate::repos::ap_aging_repo::{self, ApAgingError, ApAgingReport};
use crate::repos::ar_aging_repo::{self, ArAgingError, ArAgingReport};
use crate::repos::balance_sheet_repo::{self, BalanceSheet, BalanceSheetError};
use crate::repos::pl_repo::{self, PlReportError, ProfitAndLoss};

fn pl_err(err: PlReportError) -> ApiError {
    match err {
        PlReportError::Database(_) => ApiError::database_error(),
    }
}

fn balance_sheet_err(err: BalanceSheetError) -> ApiError {
    match err {
        BalanceSheetError::Database(_) => ApiError::database_error(),
    }
}

fn ar_aging_err(err: ArAgingError) -> ApiError {
    match err {
        ArAgingError::Database(_) => ApiError::database_error(),
    }
}

fn ap_aging_err(err: ApAgingError) -> ApiError {
    match err {
        ApAgingError::Database(_) => ApiError::database_error(),
    }
}

fn account_activity_err(err: AccountActivityError) -> ApiError {
    match err {
        AccountActivityError::NotFound(code) => {
            ApiError::not_found(format!("account not found: {code}"))
        }
        AccountActivityError::Account(_)
        | AccountActivityError::Report(_)
        | AccountActivityError::Database(_) => ApiError::database_error(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: NaiveDate,
}

pub async fn profit_and_loss(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ProfitAndLoss>, ApiError> {
    let report = pl_repo::profit_and_loss(&pool, tenant_id, range.from, range.to)
        .await
        .map_err(pl_err)?;
    Ok(Json(report))
}

pub async fn balance_sheet(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Query(as_of): Query<AsOfQuery>,
) -> Result<Json<BalanceSheet>, ApiError> {
    let report = balance_sheet_repo::balance_sheet(&pool, tenant_id, as_of.as_of)
        .await
        .map_err(balance_sheet_err)?;
    Ok(Json(report))
}

pub async fn ar_aging(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Query(as_of): Query<AsOfQuery>,
) -> Result<Json<ArAgingReport>, ApiError> {
    let report = ar_aging_repo::ar_aging(&pool, tenant_id, as_of.as_of)
        .await
        .map_err(ar_aging_err)?;
    Ok(Json(report))
}

pub async fn ap_aging(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Query(as_of): Query<AsOfQuery>,
) -> Result<Json<ApAgingReport>, ApiError> {
    let report = ap_aging_repo::ap_aging(&pool, tenant_id, as_of.as_of)
        .await
        .map_err(ap_aging_err)?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct AccountActivityQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn account_activity(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, account_code)): Path<(Uuid, String)>,
    Query(params): Query<AccountActivityQuery>,
) -> Result<Json<AccountActivityReport>, ApiError> {
    let limit = params.limit.clamp(1, 100);
    let report = account_activity_repo::account_activity(
        &pool,
        tenant_id,
        &account_code,
        params.from,
        params.to,
        limit,
        params.offset.max(0),
    )
    .await
    .map_err(account_activity_err)?;
    Ok(Json(report))
}
