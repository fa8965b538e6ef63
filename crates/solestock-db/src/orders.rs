//! Order commit and the admin order views.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use solestock_core::orders::{
    add_requirements, covers, effective_minimum_order, format_brl, Requirement,
};
use solestock_core::{
    validate_order_request, OrderRequest, OrderStatus, StockType, ValidatedOrder,
    VariantKey,
};
use sqlx::PgPool;

use crate::grades::load_template_lines;
use crate::DbError;

const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_whatsapp: String,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub size_id: Option<i64>,
    pub color_id: Option<i64>,
    pub color_name: Option<String>,
    pub grade_id: Option<i64>,
    pub grade_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub item_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

/// Outcome of a successful commit. `order` is the validated cart the
/// share message and notification are rendered from.
#[derive(Debug, Clone)]
pub struct CommittedOrder {
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub order: ValidatedOrder,
}

#[derive(sqlx::FromRow)]
struct ProductCheck {
    name: String,
    active: bool,
    stock_type: String,
    sell_without_stock: bool,
}

const ORDER_SELECT: &str = "SELECT o.id, o.customer_email, c.name AS customer_name, \
            c.whatsapp AS customer_whatsapp, o.total_amount, o.status, o.created_at, o.updated_at \
     FROM orders o \
     JOIN customers c ON c.email = o.customer_email";

/// Validates a cart, reserves its stock, and records the order atomically.
///
/// Every item must be a grade purchase of an active, grade-typed product
/// with an active (product, color, grade) assignment and a non-empty
/// template. Demand is summed per variant across the cart and the variant
/// rows are locked in key order before any stock is checked, so concurrent
/// commits on the same variants serialize and cannot oversell. Any failure
/// rolls back every write.
///
/// # Errors
///
/// - [`DbError::Validation`] for a malformed cart, a non-grade product, a
///   missing assignment, an empty template, or a total below the minimum order.
/// - [`DbError::NotFound`] when an item references a missing product.
/// - [`DbError::InsufficientStock`] when a variant cannot cover the cart.
/// - [`DbError::Sqlx`] on query failure.
pub async fn commit_order(pool: &PgPool, request: &OrderRequest) -> Result<CommittedOrder, DbError> {
    let order = validate_order_request(request).map_err(|e| DbError::Validation(e.to_string()))?;

    let mut tx = pool.begin().await?;
    let mut requirements: BTreeMap<VariantKey, Requirement> = BTreeMap::new();

    for line in &order.lines {
        let product = sqlx::query_as::<_, ProductCheck>(
            "SELECT name, active, stock_type, sell_without_stock FROM products WHERE id = $1",
        )
        .bind(line.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if !product.active {
            return Err(DbError::Validation(format!(
                "product '{}' is not available",
                product.name
            )));
        }
        if product.stock_type != StockType::Grade.as_str() {
            return Err(DbError::Validation(format!(
                "product '{}' is sold by size and cannot be ordered as a grade",
                product.name
            )));
        }

        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM product_color_grades pcg \
                 JOIN grades g ON g.id = pcg.grade_id \
                 WHERE pcg.product_id = $1 AND pcg.color_id = $2 AND pcg.grade_id = $3 \
                   AND g.active = true)",
        )
        .bind(line.product_id)
        .bind(line.color_id)
        .bind(line.grade_id)
        .fetch_one(&mut *tx)
        .await?;

        if !assigned {
            return Err(DbError::Validation(format!(
                "grade {} is not offered for product '{}' in color {}",
                line.grade_id, product.name, line.color_id
            )));
        }

        let template = load_template_lines(&mut *tx, line.grade_id).await?;
        if template.is_empty() {
            return Err(DbError::Validation(format!(
                "grade {} has no sizes configured",
                line.grade_id
            )));
        }

        if !product.sell_without_stock {
            add_requirements(
                &mut requirements,
                line.product_id,
                &product.name,
                line.color_id,
                &template,
                line.quantity,
            );
        }
    }

    // BTreeMap iteration is the lock order.
    for (key, requirement) in &requirements {
        let available: Option<i32> = sqlx::query_scalar(
            "SELECT stock FROM product_variants \
             WHERE product_id = $1 AND size_id = $2 AND color_id = $3 \
             FOR UPDATE",
        )
        .bind(key.product_id)
        .bind(key.size_id)
        .bind(key.color_id)
        .fetch_optional(&mut *tx)
        .await?;

        if !covers(available, requirement.required) {
            return Err(DbError::InsufficientStock {
                product: requirement.product_name.clone(),
                size: requirement.size_name.clone(),
                required: requirement.required,
                available: available.map_or(0, i64::from),
            });
        }
    }

    let customer_minimum: Option<Decimal> = sqlx::query_scalar(
        "INSERT INTO customers (name, email, whatsapp) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO UPDATE SET \
             name       = EXCLUDED.name, \
             whatsapp   = EXCLUDED.whatsapp, \
             updated_at = NOW() \
         RETURNING minimum_order",
    )
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer.whatsapp)
    .fetch_one(&mut *tx)
    .await?;

    let store_minimum: Decimal =
        sqlx::query_scalar("SELECT minimum_order FROM store_settings WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(Decimal::ZERO);

    let minimum = effective_minimum_order(customer_minimum, store_minimum);
    if order.total_amount < minimum {
        return Err(DbError::Validation(format!(
            "order total {} is below the minimum order of {}",
            format_brl(order.total_amount),
            format_brl(minimum)
        )));
    }

    let (order_id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
        "INSERT INTO orders (customer_email, total_amount, status) VALUES ($1, $2, $3) \
         RETURNING id, created_at",
    )
    .bind(&order.customer.email)
    .bind(order.total_amount)
    .bind(OrderStatus::Pending.as_str())
    .fetch_one(&mut *tx)
    .await?;

    for (key, requirement) in &requirements {
        let units = i32::try_from(requirement.required).map_err(|_| {
            DbError::Validation(format!(
                "requested quantity for '{}' is too large",
                requirement.product_name
            ))
        })?;
        sqlx::query(
            "UPDATE product_variants SET stock = stock - $4, updated_at = NOW() \
             WHERE product_id = $1 AND size_id = $2 AND color_id = $3",
        )
        .bind(key.product_id)
        .bind(key.size_id)
        .bind(key.color_id)
        .bind(units)
        .execute(&mut *tx)
        .await?;
    }

    for line in &order.lines {
        sqlx::query(
            "INSERT INTO order_items \
                 (order_id, product_id, size_id, color_id, grade_id, quantity, \
                  unit_price, total_price, type) \
             VALUES ($1, $2, NULL, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.color_id)
        .bind(line.grade_id)
        .bind(line.quantity)
        .bind(line.unit_price())
        .bind(line.total_price)
        .bind(line.item_type().as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        items = order.lines.len(),
        variants = requirements.len(),
        total = %order.total_amount,
        "order committed"
    );

    Ok(CommittedOrder {
        order_id,
        created_at,
        status: OrderStatus::Pending,
        total_amount: order.total_amount,
        order,
    })
}

/// Lists orders newest first. `limit` is clamped to `1..=200`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    status: Option<OrderStatus>,
    limit: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "{ORDER_SELECT} \
         WHERE ($1::TEXT IS NULL OR o.status = $1) \
         ORDER BY o.created_at DESC, o.id DESC \
         LIMIT $2"
    ))
    .bind(status.map(OrderStatus::as_str))
    .bind(limit.clamp(1, MAX_LIST_LIMIT))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetches one order with its items.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn get_order(pool: &PgPool, id: i64) -> Result<OrderDetail, DbError> {
    let order = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT oi.id, oi.product_id, p.name AS product_name, oi.size_id, oi.color_id, \
                c.name AS color_name, oi.grade_id, g.name AS grade_name, oi.quantity, \
                oi.unit_price, oi.total_price, oi.type \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id \
         LEFT JOIN colors c ON c.id = oi.color_id \
         LEFT JOIN grades g ON g.id = oi.grade_id \
         WHERE oi.order_id = $1 \
         ORDER BY oi.id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(OrderDetail { order, items })
}

/// Moves an order to `status`. Stock is not touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn update_order_status(
    pool: &PgPool,
    id: i64,
    status: OrderStatus,
) -> Result<OrderRow, DbError> {
    let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}
