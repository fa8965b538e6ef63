//! Database operations for the `customers` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use solestock_core::CustomerInput;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub approved: bool,
    /// Overrides the store-wide minimum when positive.
    pub minimum_order: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CUSTOMER_COLUMNS: &str =
    "id, name, email, whatsapp, approved, minimum_order, created_at, updated_at";

/// Registers a new, unapproved customer.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for blank fields, [`DbError::Conflict`]
/// when the email is already registered, or [`DbError::Sqlx`] on failure.
pub async fn register_customer(
    pool: &PgPool,
    input: &CustomerInput,
) -> Result<CustomerRow, DbError> {
    let name = input.name.trim();
    let email = input.email.trim().to_lowercase();
    let whatsapp = input.whatsapp.trim();
    if name.is_empty() || email.is_empty() || whatsapp.is_empty() {
        return Err(DbError::Validation(
            "name, email and whatsapp are required".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "INSERT INTO customers (name, email, whatsapp) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO NOTHING \
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(name)
    .bind(&email)
    .bind(whatsapp)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| DbError::Conflict(format!("customer '{email}' is already registered")))
}

/// Lists customers, pending approvals first, then by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_customers(
    pool: &PgPool,
    approved: Option<bool>,
) -> Result<Vec<CustomerRow>, DbError> {
    let rows = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers \
         WHERE ($1::BOOLEAN IS NULL OR approved = $1) \
         ORDER BY approved, name"
    ))
    .bind(approved)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Sets a customer's `approved` flag.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the customer does not exist.
pub async fn approve_customer(
    pool: &PgPool,
    id: i64,
    approved: bool,
) -> Result<CustomerRow, DbError> {
    sqlx::query_as::<_, CustomerRow>(&format!(
        "UPDATE customers SET approved = $2, updated_at = NOW() WHERE id = $1 \
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(id)
    .bind(approved)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Sets or clears a customer's minimum order override.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a negative amount or
/// [`DbError::NotFound`] if the customer does not exist.
pub async fn set_customer_minimum_order(
    pool: &PgPool,
    id: i64,
    minimum_order: Option<Decimal>,
) -> Result<CustomerRow, DbError> {
    if minimum_order.is_some_and(|m| m < Decimal::ZERO) {
        return Err(DbError::Validation(
            "minimum order cannot be negative".to_string(),
        ));
    }

    sqlx::query_as::<_, CustomerRow>(&format!(
        "UPDATE customers SET minimum_order = $2, updated_at = NOW() WHERE id = $1 \
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(id)
    .bind(minimum_order)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
