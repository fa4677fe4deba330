use axum::{
    extract::{Path, State},
    Json,
};
use platform_http_contracts::ApiError;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::customer_repo::{self, Customer, CustomerError};

fn map_err(err: CustomerError) -> ApiError {
    match err {
        CustomerError::EmptyName => ApiError::validation(err.to_string()),
        CustomerError::NotFound { .. } => ApiError::not_found(err.to_string()),
        CustomerError::Database(_) => ApiError::database_error(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerBody {
    pub display_name: String,
    pub phone: Option<String>,
    pub external_ref: Option<String>,
}

pub async fn create_customer(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<CreateCustomerBody>,
) -> Result<Json<Customer>, ApiError> {
    let customer = customer_repo::insert(
        &pool,
        tenant_id,
        &body.display_name,
        body.phone.as_deref(),
        body.external_ref.as_deref(),
    )
    .await
    .map_err(map_err)?;
    Ok(Json(customer))
}

pub async fn list_customers(
    State(pool): State<Arc<PgPool>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = customer_repo::list(&pool, tenant_id).await.map_err(map_err)?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(pool): State<Arc<PgPool>>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Customer>, ApiError> {
    let customer = customer_repo::find_by_id(&pool, tenant_id, id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(Json(customer))
}
