use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct Customer {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("customer not found: tenant_id={tenant_id}, id={id}")]
    NotFound { tenant_id: Uuid, id: Uuid },

    #[error("display_name must not be empty")]
    EmptyName,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn insert(
    pool: &PgPool,
    tenant_id: Uuid,
    display_name: &str,
    phone: Option<&str>,
    external_ref: Option<&str>,
) -> Result<Customer, CustomerError> {
    if display_name.trim().is_empty() {
        return Err(CustomerError::EmptyName);
    }
    let id = Uuid::new_v4();
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (id, tenant_id, display_name, phone, external_ref)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, tenant_id, display_name, phone, external_ref, created_at
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(display_name)
    .bind(phone)
    .bind(external_ref)
    .fetch_one(pool)
    .await?;
    Ok(customer)
}

pub async fn find_by_id(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<Customer>, CustomerError> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, tenant_id, display_name, phone, external_ref, created_at
         FROM customers WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(customer)
}

pub async fn find_by_external_ref(
    pool: &PgPool,
    tenant_id: Uuid,
    external_ref: &str,
) -> Result<Option<Customer>, CustomerError> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, tenant_id, display_name, phone, external_ref, created_at
         FROM customers WHERE tenant_id = $1 AND external_ref = $2",
    )
    .bind(tenant_id)
    .bind(external_ref)
    .fetch_optional(pool)
    .await?;
    Ok(customer)
}

pub async fn find_by_phone(
    pool: &PgPool,
    tenant_id: Uuid,
    phone: &str,
) -> Result<Option<Customer>, CustomerError> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, tenant_id, display_name, phone, external_ref, created_at
         FROM customers WHERE tenant_id = $1 AND phone = $2
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(tenant_id)
    .bind(phone)
    .fetch_optional(pool)
    .await?;
    Ok(customer)
}

pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Customer>, CustomerError> {
    let customers = sqlx::query_as::<_, Customer>(
        "SELECT id, tenant_id, display_name, phone, external_ref, created_at
         FROM customers WHERE tenant_id = $1 ORDER BY display_name ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(customers)
}

/// Resolves the external POS import's auto-create contract: find by
/// `external_ref` first, then by `phone`, and only create a new customer
/// when neither matches.
pub async fn find_or_create_by_external_ref_or_phone(
    pool: &PgPool,
    tenant_id: Uuid,
    display_name: &str,
    phone: Option<&str>,
    external_ref: Option<&str>,
) -> Result<Customer, CustomerError> {
    if let Some(ext_ref) = external_ref {
        if let Some(existing) = find_by_external_ref(pool, tenant_id, ext_ref).await? {
            return Ok(existing);
        }
    }
    if let Some(phone) = phone {
        if let Some(existing) = find_by_phone(pool, tenant_id, phone).await? {
            return Ok(existing);
        }
    }
    insert(pool, tenant_id, display_name, phone, external_ref).await
}
