//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solestock_core::StockType;
use sqlx::PgPool;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.category_id, c.name AS category_name, \
     p.base_price, p.sale_price, p.suggested_price, p.sku, p.parent_sku, p.parent_id, \
     p.photo, p.active, p.stock_type, p.sell_without_stock, p.created_at, p.updated_at";

/// A row from `products`, joined with its category name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub suggested_price: Option<Decimal>,
    pub sku: Option<String>,
    pub parent_sku: Option<String>,
    /// Lookup relation used to group variants of the same model; never an
    /// ownership edge.
    pub parent_id: Option<i64>,
    pub photo: Option<String>,
    pub active: bool,
    /// `size` or `grade`; constrained by a CHECK in the schema.
    pub stock_type: String,
    pub sell_without_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Parsed `stock_type`. The schema CHECK keeps this to known values;
    /// anything else is reported as a validation failure.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for an unknown stock type.
    pub fn stock_type(&self) -> Result<StockType, DbError> {
        self.stock_type
            .parse::<StockType>()
            .map_err(|e| DbError::Validation(e.to_string()))
    }
}

/// Editable product fields, used for both create and full update.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category_id: Option<i64>,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub suggested_price: Option<Decimal>,
    pub sku: Option<String>,
    pub parent_sku: Option<String>,
    pub parent_id: Option<i64>,
    pub photo: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub stock_type: StockType,
    #[serde(default)]
    pub sell_without_stock: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProductListFilters<'a> {
    pub active_only: bool,
    pub category_id: Option<i64>,
    pub search: Option<&'a str>,
    pub limit: Option<i64>,
}

/// Lists products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: ProductListFilters<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let search = filters.search.map(|s| format!("%{}%", s.trim()));
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products p \
         LEFT JOIN categories c ON c.id = p.category_id \
         WHERE ($1 = false OR p.active = true) \
           AND ($2::BIGINT IS NULL OR p.category_id = $2) \
           AND ($3::TEXT IS NULL OR p.name ILIKE $3 OR p.sku ILIKE $3) \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $4"
    ))
    .bind(filters.active_only)
    .bind(filters.category_id)
    .bind(search)
    .bind(filters.limit.unwrap_or(50))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetches one product regardless of its `active` flag.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products p \
         LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Inserts a product and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (duplicate SKU, unknown
/// category or parent).
pub async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<ProductRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products \
             (name, category_id, base_price, sale_price, suggested_price, sku, parent_sku, \
              parent_id, photo, active, stock_type, sell_without_stock) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id",
    )
    .bind(&input.name)
    .bind(input.category_id)
    .bind(input.base_price)
    .bind(input.sale_price)
    .bind(input.suggested_price)
    .bind(&input.sku)
    .bind(&input.parent_sku)
    .bind(input.parent_id)
    .bind(&input.photo)
    .bind(input.active)
    .bind(input.stock_type.as_str())
    .bind(input.sell_without_stock)
    .fetch_one(pool)
    .await?;

    get_product(pool, id).await?.ok_or(DbError::NotFound)
}

/// Replaces every editable field of a product.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    input: &ProductInput,
) -> Result<ProductRow, DbError> {
    if input.parent_id == Some(id) {
        return Err(DbError::Validation(
            "a product cannot be its own parent".to_string(),
        ));
    }

    let result = sqlx::query(
        "UPDATE products SET \
             name = $2, category_id = $3, base_price = $4, sale_price = $5, \
             suggested_price = $6, sku = $7, parent_sku = $8, parent_id = $9, photo = $10, \
             active = $11, stock_type = $12, sell_without_stock = $13, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&input.name)
    .bind(input.category_id)
    .bind(input.base_price)
    .bind(input.sale_price)
    .bind(input.suggested_price)
    .bind(&input.sku)
    .bind(&input.parent_sku)
    .bind(input.parent_id)
    .bind(&input.photo)
    .bind(input.active)
    .bind(input.stock_type.as_str())
    .bind(input.sell_without_stock)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_product(pool, id).await?.ok_or(DbError::NotFound)
}

/// Soft-deletes a product by clearing `active`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn deactivate_product(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE products SET active = false, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
