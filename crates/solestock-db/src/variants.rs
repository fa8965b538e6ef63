//! Database operations for `product_variants`, the per-(size, color) stock
//! ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solestock_core::VariantStock;
use sqlx::PgPool;

use crate::catalog::{find_or_create_color, find_or_create_size};
use crate::DbError;

/// A variant joined with its size and color names.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub size_id: i64,
    pub size_name: String,
    pub color_id: i64,
    pub color_name: String,
    pub stock: i32,
    pub price_override: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    #[must_use]
    pub fn as_stock(&self) -> VariantStock {
        VariantStock {
            size_id: self.size_id,
            color_id: self.color_id,
            stock: self.stock,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub size_id: i64,
    pub color_id: i64,
    pub stock: i32,
    pub price_override: Option<Decimal>,
}

const VARIANT_SELECT: &str = "SELECT v.id, v.product_id, v.size_id, s.name AS size_name, \
            v.color_id, c.name AS color_name, v.stock, v.price_override, v.updated_at \
     FROM product_variants v \
     JOIN sizes s ON s.id = v.size_id \
     JOIN colors c ON c.id = v.color_id";

/// Returns every variant of a product ordered by color, then size.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variants(pool: &PgPool, product_id: i64) -> Result<Vec<VariantRow>, DbError> {
    let rows = sqlx::query_as::<_, VariantRow>(&format!(
        "{VARIANT_SELECT} WHERE v.product_id = $1 ORDER BY c.name, s.sort_order, s.name"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts or replaces the variant for `(product, size, color)`.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for negative stock, or [`DbError::Sqlx`]
/// if the upsert fails (unknown product, size or color).
pub async fn upsert_variant(
    pool: &PgPool,
    product_id: i64,
    input: &VariantInput,
) -> Result<VariantRow, DbError> {
    if input.stock < 0 {
        return Err(DbError::Validation("stock cannot be negative".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO product_variants (product_id, size_id, color_id, stock, price_override) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (product_id, size_id, color_id) DO UPDATE SET \
             stock          = EXCLUDED.stock, \
             price_override = EXCLUDED.price_override, \
             updated_at     = NOW() \
         RETURNING id",
    )
    .bind(product_id)
    .bind(input.size_id)
    .bind(input.color_id)
    .bind(input.stock)
    .bind(input.price_override)
    .fetch_one(pool)
    .await?;

    fetch_variant(pool, id).await
}

/// Sets the stock of one variant to an explicit value (admin edit).
///
/// # Errors
///
/// Returns [`DbError::Validation`] for negative stock or [`DbError::NotFound`]
/// if the variant does not belong to the product.
pub async fn set_variant_stock(
    pool: &PgPool,
    product_id: i64,
    variant_id: i64,
    stock: i32,
) -> Result<VariantRow, DbError> {
    if stock < 0 {
        return Err(DbError::Validation("stock cannot be negative".to_string()));
    }

    let result = sqlx::query(
        "UPDATE product_variants SET stock = $1, updated_at = NOW() \
         WHERE id = $2 AND product_id = $3",
    )
    .bind(stock)
    .bind(variant_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    fetch_variant(pool, variant_id).await
}

/// Creates a zero-stock variant for every size of a size group in one color.
///
/// Sizes named by the group but missing from `sizes` are created. Existing
/// variants are left untouched. Returns the number of variants created.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the size group does not exist, or
/// [`DbError::Sqlx`] on failure (the whole batch rolls back).
pub async fn create_variants_from_size_group(
    pool: &PgPool,
    product_id: i64,
    color_id: i64,
    size_group_id: i64,
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    let sizes: Vec<String> =
        sqlx::query_scalar("SELECT sizes FROM size_groups WHERE id = $1")
            .bind(size_group_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

    let mut created = 0usize;
    for size_name in &sizes {
        let size_id = find_or_create_size(&mut tx, size_name).await?;
        let inserted = sqlx::query(
            "INSERT INTO product_variants (product_id, size_id, color_id, stock) \
             VALUES ($1, $2, $3, 0) \
             ON CONFLICT (product_id, size_id, color_id) DO NOTHING",
        )
        .bind(product_id)
        .bind(size_id)
        .bind(color_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted > 0 {
            created += 1;
        }
    }

    tx.commit().await?;
    Ok(created)
}

/// Upserts a variant addressed by size and color names, creating either
/// reference row when missing. Used by bulk import.
pub(crate) async fn upsert_variant_by_names(
    conn: &mut sqlx::PgConnection,
    product_id: i64,
    size_name: &str,
    color_name: &str,
    stock: i32,
    price_override: Option<Decimal>,
) -> Result<(), DbError> {
    let size_id = find_or_create_size(conn, size_name).await?;
    let color_id = find_or_create_color(conn, color_name).await?;

    sqlx::query(
        "INSERT INTO product_variants (product_id, size_id, color_id, stock, price_override) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (product_id, size_id, color_id) DO UPDATE SET \
             stock          = EXCLUDED.stock, \
             price_override = EXCLUDED.price_override, \
             updated_at     = NOW()",
    )
    .bind(product_id)
    .bind(size_id)
    .bind(color_id)
    .bind(stock)
    .bind(price_override)
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_variant(pool: &PgPool, id: i64) -> Result<VariantRow, DbError> {
    sqlx::query_as::<_, VariantRow>(&format!("{VARIANT_SELECT} WHERE v.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}
