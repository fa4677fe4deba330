//! HTTP routes for C3 (chart of accounts) and company bootstrap.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::account_repo::{Account, AccountType};
use crate::services::chart_of_accounts_service::{self, ChartOfAccountsError, CreateAccountRequest};
use crate::services::company_bootstrap_service::{self, CompanyAccounts};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: ChartOfAccountsError) -> Response {
    let status = match &err {
        ChartOfAccountsError::EmptyCode | ChartOfAccountsError::EmptyName => StatusCode::BAD_REQUEST,
        ChartOfAccountsError::Account(e) => match e {
            crate::repos::account_repo::AccountError::DuplicateCode { .. } => StatusCode::CONFLICT,
            crate::repos::account_repo::AccountError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        },
    };
    (status, Json(ErrorResponse { error: err.to_string() })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountBody {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
}

pub async fn create_account(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<String>,
    Json(body): Json<CreateAccountBody>,
) -> Result<Json<AccountResponse>, Response> {
    let account = chart_of_accounts_service::create_account(
        &pool,
        CreateAccountRequest {
            tenant_id,
            code: body.code,
            name: body.name,
            account_type: body.account_type,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(AccountResponse::from(account)))
}

pub async fn list_accounts(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<AccountResponse>>, Response> {
    let accounts = chart_of_accounts_service::list_accounts(&pool, &tenant_id)
        .await
        .map_err(error_response)?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        AccountResponse {
            id: a.id,
            code: a.code,
            name: a.name,
            is_active: a.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BootstrapCompanyBody {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct BootstrapCompanyResponse {
    pub tenant_id: Uuid,
    pub accounts: Vec<String>,
}

pub async fn bootstrap_company(
    State(pool): State<Arc<PgPool>>,
    Json(body): Json<BootstrapCompanyBody>,
) -> Result<Json<BootstrapCompanyResponse>, Response> {
    let accounts = company_bootstrap_service::bootstrap_company(
        &pool,
        body.tenant_id,
        &body.name,
        &body.default_currency,
    )
    .await
    .map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response()
    })?;
    Ok(Json(BootstrapCompanyResponse {
        tenant_id: body.tenant_id,
        accounts: account_codes(&accounts),
    }))
}

fn account_codes(accounts: &CompanyAccounts) -> Vec<String> {
    vec![
        accounts.ar.code.clone(),
        accounts.ap.code.clone(),
        accounts.cash.code.clone(),
        accounts.sales_income.code.clone(),
        accounts.tax_payable.code.clone(),
        accounts.tax_receivable.code.clone(),
        accounts.inventory_asset.code.clone(),
        accounts.cogs.code.clone(),
        accounts.customer_advance_liability.code.clone(),
        accounts.vendor_advance_asset.code.clone(),
    ]
}
