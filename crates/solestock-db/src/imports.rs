//! Row-level bulk import and the matching export.
//!
//! A row describes one product (keyed by SKU) and optionally one variant of
//! it. Each row is written in its own transaction so a bad row never blocks
//! the rest of a batch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solestock_core::StockType;
use sqlx::{PgConnection, PgPool};

use crate::variants::upsert_variant_by_names;
use crate::DbError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default = "default_stock_type")]
    pub stock_type: StockType,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub price_override: Option<Decimal>,
}

fn default_stock_type() -> StockType {
    StockType::Grade
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Created,
    Updated,
}

#[derive(sqlx::FromRow)]
struct ExportRecord {
    sku: Option<String>,
    name: String,
    category: Option<String>,
    base_price: Decimal,
    sale_price: Option<Decimal>,
    stock_type: String,
    color: Option<String>,
    size: Option<String>,
    stock: Option<i32>,
    price_override: Option<Decimal>,
}

/// Writes one import row: upserts the product by SKU, creates the category,
/// color and size when missing, and upserts the variant when both color and
/// size are given.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a blank SKU or name, negative prices
/// or stock, or a variant with only one of color/size; [`DbError::Sqlx`] on
/// failure. The row is rolled back in either case.
pub async fn import_row(pool: &PgPool, row: &ImportRow) -> Result<ImportOutcome, DbError> {
    validate_row(row)?;

    let mut tx = pool.begin().await?;

    let category_id = match row.category.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(find_or_create_category(&mut tx, name).await?),
        _ => None,
    };

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM products WHERE sku = $1 FOR UPDATE")
            .bind(row.sku.trim())
            .fetch_optional(&mut *tx)
            .await?;

    let (product_id, outcome) = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE products SET name = $2, category_id = $3, base_price = $4, \
                     sale_price = $5, stock_type = $6, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(row.name.trim())
            .bind(category_id)
            .bind(row.base_price)
            .bind(row.sale_price)
            .bind(row.stock_type.as_str())
            .execute(&mut *tx)
            .await?;
            (id, ImportOutcome::Updated)
        }
        None => {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO products (sku, name, category_id, base_price, sale_price, stock_type) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(row.sku.trim())
            .bind(row.name.trim())
            .bind(category_id)
            .bind(row.base_price)
            .bind(row.sale_price)
            .bind(row.stock_type.as_str())
            .fetch_one(&mut *tx)
            .await?;
            (id, ImportOutcome::Created)
        }
    };

    if let (Some(color), Some(size)) = (non_blank(row.color.as_ref()), non_blank(row.size.as_ref()))
    {
        upsert_variant_by_names(
            &mut tx,
            product_id,
            size,
            color,
            row.stock.unwrap_or(0),
            row.price_override,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(outcome)
}

/// One row per variant, plus one bare row for products without variants, in
/// the shape [`import_row`] accepts. Products without a SKU are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Validation`]
/// for a stored stock type outside the known set.
pub async fn export_rows(pool: &PgPool) -> Result<Vec<ImportRow>, DbError> {
    let records = sqlx::query_as::<_, ExportRecord>(
        "SELECT p.sku, p.name, cat.name AS category, p.base_price, p.sale_price, p.stock_type, \
                c.name AS color, s.name AS size, v.stock, v.price_override \
         FROM products p \
         LEFT JOIN categories cat ON cat.id = p.category_id \
         LEFT JOIN product_variants v ON v.product_id = p.id \
         LEFT JOIN colors c ON c.id = v.color_id \
         LEFT JOIN sizes s ON s.id = v.size_id \
         WHERE p.sku IS NOT NULL \
         ORDER BY p.sku, c.name, s.sort_order, s.name",
    )
    .fetch_all(pool)
    .await?;

    records
        .into_iter()
        .filter_map(|r| {
            let sku = r.sku?;
            Some(
                r.stock_type
                    .parse::<StockType>()
                    .map_err(|e| DbError::Validation(e.to_string()))
                    .map(|stock_type| ImportRow {
                        sku,
                        name: r.name,
                        category: r.category,
                        base_price: r.base_price,
                        sale_price: r.sale_price,
                        stock_type,
                        color: r.color,
                        size: r.size,
                        stock: r.stock,
                        price_override: r.price_override,
                    }),
            )
        })
        .collect()
}

fn validate_row(row: &ImportRow) -> Result<(), DbError> {
    if row.sku.trim().is_empty() {
        return Err(DbError::Validation("sku is required".to_string()));
    }
    if row.name.trim().is_empty() {
        return Err(DbError::Validation("name is required".to_string()));
    }
    if row.base_price < Decimal::ZERO || row.sale_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(DbError::Validation("prices cannot be negative".to_string()));
    }
    if row.stock.is_some_and(|s| s < 0) {
        return Err(DbError::Validation("stock cannot be negative".to_string()));
    }
    let has_color = non_blank(row.color.as_ref()).is_some();
    let has_size = non_blank(row.size.as_ref()).is_some();
    if has_color != has_size {
        return Err(DbError::Validation(
            "color and size must be given together".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

async fn find_or_create_category(conn: &mut PgConnection, name: &str) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ImportRow {
        ImportRow {
            sku: "RUN-01".to_string(),
            name: "Runner".to_string(),
            category: Some("Tênis".to_string()),
            base_price: Decimal::new(19990, 2),
            sale_price: None,
            stock_type: StockType::Grade,
            color: Some("Preto".to_string()),
            size: Some("39".to_string()),
            stock: Some(12),
            price_override: None,
        }
    }

    #[test]
    fn valid_row_passes() {
        assert!(validate_row(&row()).is_ok());
    }

    #[test]
    fn blank_sku_is_rejected() {
        let mut r = row();
        r.sku = "  ".to_string();
        assert!(matches!(validate_row(&r), Err(DbError::Validation(_))));
    }

    #[test]
    fn color_without_size_is_rejected() {
        let mut r = row();
        r.size = Some(String::new());
        assert!(matches!(validate_row(&r), Err(DbError::Validation(m)) if m.contains("together")));
    }

    #[test]
    fn negative_stock_is_rejected() {
        let mut r = row();
        r.stock = Some(-1);
        assert!(validate_row(&r).is_err());
    }

    #[test]
    fn stock_type_defaults_to_grade() {
        let parsed: ImportRow = serde_json::from_value(serde_json::json!({
            "sku": "X-1",
            "name": "Sandália",
            "base_price": "49.90"
        }))
        .expect("row parses");
        assert_eq!(parsed.stock_type, StockType::Grade);
        assert!(parsed.color.is_none());
    }
}
