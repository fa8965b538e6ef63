use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

// Path relative to crates/solestock-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing; values come from [`solestock_core::AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &solestock_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(
        "insufficient stock for '{product}' size {size}: required {required}, available {available}"
    )]
    InsufficientStock {
        product: String,
        size: String,
        required: i64,
        available: i64,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; treat
    // absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

/// `true` when the error is a Postgres unique-constraint violation (23505).
#[must_use]
pub fn is_unique_violation(error: &DbError) -> bool {
    matches!(
        error,
        DbError::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505")
    )
}

/// `true` when the error is a Postgres foreign-key violation (23503).
#[must_use]
pub fn is_foreign_key_violation(error: &DbError) -> bool {
    matches!(
        error,
        DbError::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503")
    )
}


pub mod availability;
pub mod catalog;
pub mod customers;
pub mod grades;
pub mod imports;
pub mod orders;
pub mod products;
pub mod settings;
pub mod variants;

pub use availability::{get_availability, Availability, ColorOffer, GradeOffer, VariantOffer};
pub use catalog::{
    create_category, create_color, create_size, create_size_group, delete_category, delete_color,
    delete_size, delete_size_group, find_or_create_color, find_or_create_size, list_categories,
    list_colors, list_size_groups, list_sizes, CategoryRow, ColorRow, SizeGroupRow, SizeRow,
};
pub use customers::{
    approve_customer, list_customers, register_customer, set_customer_minimum_order, CustomerRow,
};
pub use grades::{
    assign_grade, create_grade, delete_grade, detect_grade_source, get_grade, list_assignments,
    list_grades, seed_sample_grades, unassign_grade, update_grade, AssignmentRow, GradeDetail,
    GradeRow, GradeSource, GradeTemplateRow,
};
pub use imports::{export_rows, import_row, ImportOutcome, ImportRow};
pub use orders::{
    commit_order, get_order, list_orders, update_order_status, CommittedOrder, OrderDetail,
    OrderItemRow, OrderRow,
};
pub use products::{
    create_product, deactivate_product, get_product, list_products, update_product, ProductInput,
    ProductListFilters, ProductRow,
};
pub use settings::{get_store_settings, update_store_settings, StoreSettingsInput, StoreSettingsRow};
pub use variants::{
    create_variants_from_size_group, list_variants, set_variant_stock, upsert_variant,
    VariantInput, VariantRow,
};
