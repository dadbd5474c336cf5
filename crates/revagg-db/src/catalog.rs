//! Database operations for `products` and `platforms`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for revagg_core::Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
        }
    }
}

/// A row from the `platforms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlatformRow> for revagg_core::Platform {
    fn from(row: PlatformRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            url: row.url,
        }
    }
}

// ---------------------------------------------------------------------------
// products operations
// ---------------------------------------------------------------------------

/// Inserts a product and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    description: &str,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (id, user_id, name, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, name, description, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the product if it exists and belongs to `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_for_user(
    pool: &PgPool,
    product_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, user_id, name, description, created_at, updated_at \
         FROM products \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(product_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, user_id, name, description, created_at, updated_at \
         FROM products \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// platforms operations
// ---------------------------------------------------------------------------

/// Attaches a review platform to a product.
///
/// `name` is stored lowercased. The schema rejects the reserved tag `all`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_platform(
    pool: &PgPool,
    product_id: Uuid,
    name: &str,
    url: Option<&str>,
) -> Result<PlatformRow, DbError> {
    let row = sqlx::query_as::<_, PlatformRow>(
        "INSERT INTO platforms (id, product_id, name, url) \
         VALUES ($1, $2, LOWER($3), $4) \
         RETURNING id, product_id, name, url, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(name)
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Lists the platforms of a product owned by `user_id`.
///
/// Returns an empty list when the product does not exist or belongs to a
/// different user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_platforms_for_product(
    pool: &PgPool,
    product_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(
        "SELECT p.id, p.product_id, p.name, p.url, p.created_at, p.updated_at \
         FROM platforms p \
         INNER JOIN products pr ON pr.id = p.product_id \
         WHERE pr.id = $1 AND pr.user_id = $2 \
         ORDER BY p.created_at, p.id",
    )
    .bind(product_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
