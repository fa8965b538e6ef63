//! Database operations for the catalog reference tables: `categories`,
//! `colors`, `sizes`, and `size_groups`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ColorRow {
    pub id: i64,
    pub name: String,
    pub hex_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SizeRow {
    pub id: i64,
    pub name: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A named set of size names used when bulk-creating variants.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SizeGroupRow {
    pub id: i64,
    pub name: String,
    pub sizes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// categories
// ---------------------------------------------------------------------------

/// Returns all categories ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, created_at FROM categories ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts a category. Names are unique; a duplicate surfaces as a
/// unique-violation [`DbError::Sqlx`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_category(pool: &PgPool, name: &str) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a category; products in it keep existing with no category.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matched.
pub async fn delete_category(pool: &PgPool, id: i64) -> Result<(), DbError> {
    delete_by_id(pool, "categories", id).await
}

// ---------------------------------------------------------------------------
// colors
// ---------------------------------------------------------------------------

/// Returns all colors ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_colors(pool: &PgPool) -> Result<Vec<ColorRow>, DbError> {
    let rows = sqlx::query_as::<_, ColorRow>(
        "SELECT id, name, hex_code, created_at FROM colors ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts a color.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including duplicate name).
pub async fn create_color(
    pool: &PgPool,
    name: &str,
    hex_code: Option<&str>,
) -> Result<ColorRow, DbError> {
    let row = sqlx::query_as::<_, ColorRow>(
        "INSERT INTO colors (name, hex_code) VALUES ($1, $2) \
         RETURNING id, name, hex_code, created_at",
    )
    .bind(name)
    .bind(hex_code)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a color.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matched, or a foreign-key
/// [`DbError::Sqlx`] while variants still reference it.
pub async fn delete_color(pool: &PgPool, id: i64) -> Result<(), DbError> {
    delete_by_id(pool, "colors", id).await
}

/// Returns the id of the color named `name`, creating it when missing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn find_or_create_color(conn: &mut PgConnection, name: &str) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO colors (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

// ---------------------------------------------------------------------------
// sizes
// ---------------------------------------------------------------------------

/// Returns all sizes by `sort_order`, then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sizes(pool: &PgPool) -> Result<Vec<SizeRow>, DbError> {
    let rows = sqlx::query_as::<_, SizeRow>(
        "SELECT id, name, sort_order, created_at FROM sizes ORDER BY sort_order, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts a size.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including duplicate name).
pub async fn create_size(pool: &PgPool, name: &str, sort_order: i32) -> Result<SizeRow, DbError> {
    let row = sqlx::query_as::<_, SizeRow>(
        "INSERT INTO sizes (name, sort_order) VALUES ($1, $2) \
         RETURNING id, name, sort_order, created_at",
    )
    .bind(name)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a size.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matched.
pub async fn delete_size(pool: &PgPool, id: i64) -> Result<(), DbError> {
    delete_by_id(pool, "sizes", id).await
}

/// Returns the id of the size named `name`, creating it when missing.
///
/// New sizes whose name is numeric get that number as `sort_order`, so shoe
/// sizes sort naturally.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn find_or_create_size(conn: &mut PgConnection, name: &str) -> Result<i64, DbError> {
    let sort_order = name.trim().parse::<i32>().unwrap_or(0);
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sizes (name, sort_order) VALUES ($1, $2) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(name)
    .bind(sort_order)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

// ---------------------------------------------------------------------------
// size_groups
// ---------------------------------------------------------------------------

/// Returns all size groups ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_size_groups(pool: &PgPool) -> Result<Vec<SizeGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, SizeGroupRow>(
        "SELECT id, name, sizes, created_at FROM size_groups ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts a size group. Blank size names are dropped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including duplicate name).
pub async fn create_size_group(
    pool: &PgPool,
    name: &str,
    sizes: &[String],
) -> Result<SizeGroupRow, DbError> {
    let sizes: Vec<String> = sizes
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let row = sqlx::query_as::<_, SizeGroupRow>(
        "INSERT INTO size_groups (name, sizes) VALUES ($1, $2) \
         RETURNING id, name, sizes, created_at",
    )
    .bind(name)
    .bind(&sizes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a size group.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matched.
pub async fn delete_size_group(pool: &PgPool, id: i64) -> Result<(), DbError> {
    delete_by_id(pool, "size_groups", id).await
}

/// `table` is always one of the fixed names above, never caller input.
async fn delete_by_id(pool: &PgPool, table: &'static str, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
