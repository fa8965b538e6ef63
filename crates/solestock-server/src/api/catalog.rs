//! Admin CRUD for catalog reference data.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use solestock_db::{CategoryRow, ColorRow, SizeGroupRow, SizeRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ColorRequest {
    pub name: String,
    pub hex_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SizeRequest {
    pub name: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SizeGroupRequest {
    pub name: String,
    pub sizes: Vec<String>,
}

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

fn require_name(req_id: &str, name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "name must be between 1 and 100 characters",
        ));
    }
    Ok(name.to_owned())
}

fn validate_hex(req_id: &str, hex: &str) -> Result<(), ApiError> {
    let digits = hex.strip_prefix('#').unwrap_or_default();
    if matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("hex_code must look like #RRGGBB, got '{hex}'"),
        ))
    }
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CategoryRow>>>, ApiError> {
    let rows = solestock_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NameRequest>,
) -> Result<Created<CategoryRow>, ApiError> {
    let name = require_name(&req_id.0, &body.name)?;
    let row = solestock_db::create_category(&state.pool, &name)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    solestock_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_colors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ColorRow>>>, ApiError> {
    let rows = solestock_db::list_colors(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn create_color(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ColorRequest>,
) -> Result<Created<ColorRow>, ApiError> {
    let name = require_name(&req_id.0, &body.name)?;
    if let Some(ref hex) = body.hex_code {
        validate_hex(&req_id.0, hex)?;
    }
    let row = solestock_db::create_color(&state.pool, &name, body.hex_code.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn delete_color(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    solestock_db::delete_color(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_sizes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SizeRow>>>, ApiError> {
    let rows = solestock_db::list_sizes(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

/// POST /api/v1/admin/sizes: `sort_order` defaults to the numeric value of
/// the name when it has one.
pub(super) async fn create_size(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SizeRequest>,
) -> Result<Created<SizeRow>, ApiError> {
    let name = require_name(&req_id.0, &body.name)?;
    let sort_order = body
        .sort_order
        .unwrap_or_else(|| name.parse::<i32>().unwrap_or(0));
    let row = solestock_db::create_size(&state.pool, &name, sort_order)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn delete_size(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    solestock_db::delete_size(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_size_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SizeGroupRow>>>, ApiError> {
    let rows = solestock_db::list_size_groups(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn create_size_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SizeGroupRequest>,
) -> Result<Created<SizeGroupRow>, ApiError> {
    let name = require_name(&req_id.0, &body.name)?;
    if body.sizes.iter().all(|s| s.trim().is_empty()) {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            "a size group needs at least one size",
        ));
    }
    let row = solestock_db::create_size_group(&state.pool, &name, &body.sizes)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn delete_size_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    solestock_db::delete_size_group(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_codes_accept_short_and_long_forms() {
        assert!(validate_hex("r", "#fff").is_ok());
        assert!(validate_hex("r", "#1A2b3C").is_ok());
    }

    #[test]
    fn hex_codes_reject_missing_hash_and_bad_digits() {
        assert!(validate_hex("r", "ffffff").is_err());
        assert!(validate_hex("r", "#ggg").is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(require_name("r", "   ").is_err());
        assert_eq!(require_name("r", " Tênis ").expect("valid"), "Tênis");
    }
}
