//! The singleton `store_settings` row that themes the storefront.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoreSettingsRow {
    pub store_name: String,
    pub whatsapp: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub banner_text: Option<String>,
    pub minimum_order: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettingsInput {
    pub store_name: String,
    pub whatsapp: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub banner_text: Option<String>,
    #[serde(default)]
    pub minimum_order: Decimal,
}

const SETTINGS_COLUMNS: &str = "store_name, whatsapp, primary_color, secondary_color, \
     logo_url, banner_text, minimum_order, updated_at";

/// Reads the settings row, recreating the defaults if it was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_store_settings(pool: &PgPool) -> Result<StoreSettingsRow, DbError> {
    let row = sqlx::query_as::<_, StoreSettingsRow>(&format!(
        "INSERT INTO store_settings (id) VALUES (1) \
         ON CONFLICT (id) DO UPDATE SET id = store_settings.id \
         RETURNING {SETTINGS_COLUMNS}"
    ))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Replaces every settings field.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a blank store name or negative
/// minimum order, or [`DbError::Sqlx`] on failure.
pub async fn update_store_settings(
    pool: &PgPool,
    input: &StoreSettingsInput,
) -> Result<StoreSettingsRow, DbError> {
    if input.store_name.trim().is_empty() {
        return Err(DbError::Validation("store name is required".to_string()));
    }
    if input.minimum_order < Decimal::ZERO {
        return Err(DbError::Validation(
            "minimum order cannot be negative".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, StoreSettingsRow>(&format!(
        "INSERT INTO store_settings \
             (id, store_name, whatsapp, primary_color, secondary_color, logo_url, \
              banner_text, minimum_order) \
         VALUES (1, $1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (id) DO UPDATE SET \
             store_name      = EXCLUDED.store_name, \
             whatsapp        = EXCLUDED.whatsapp, \
             primary_color   = EXCLUDED.primary_color, \
             secondary_color = EXCLUDED.secondary_color, \
             logo_url        = EXCLUDED.logo_url, \
             banner_text     = EXCLUDED.banner_text, \
             minimum_order   = EXCLUDED.minimum_order, \
             updated_at      = NOW() \
         RETURNING {SETTINGS_COLUMNS}"
    ))
    .bind(input.store_name.trim())
    .bind(&input.whatsapp)
    .bind(&input.primary_color)
    .bind(&input.secondary_color)
    .bind(&input.logo_url)
    .bind(&input.banner_text)
    .bind(input.minimum_order)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
