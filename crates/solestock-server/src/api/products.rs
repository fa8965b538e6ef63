//! Admin product and variant handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use solestock_db::{ProductInput, ProductListFilters, ProductRow, VariantInput, VariantRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AdminProductQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub active_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StockRequest {
    pub stock: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct SizeGroupVariantsRequest {
    pub color_id: i64,
    pub size_group_id: i64,
}

fn validate_product(req_id: &str, input: &ProductInput) -> Result<(), ApiError> {
    let name = input.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "name must be between 1 and 200 characters",
        ));
    }
    let prices = [Some(input.base_price), input.sale_price, input.suggested_price];
    if prices.iter().flatten().any(|p| *p < Decimal::ZERO) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "prices cannot be negative",
        ));
    }
    Ok(())
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AdminProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    let rows = solestock_db::list_products(
        &state.pool,
        ProductListFilters {
            active_only: query.active_only,
            category_id: query.category_id,
            search: query.search.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let product = solestock_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "product not found"))?;

    Ok(ApiResponse::new(product, req_id.0))
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRow>>), ApiError> {
    validate_product(&req_id.0, &body)?;
    let row = solestock_db::create_product(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ProductInput>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    validate_product(&req_id.0, &body)?;
    let row = solestock_db::update_product(&state.pool, id, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}

/// DELETE /api/v1/admin/products/:id: soft-delete.
pub(super) async fn deactivate_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    solestock_db::deactivate_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        serde_json::json!({ "deactivated": true }),
        req_id.0,
    ))
}

pub(super) async fn list_variants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<VariantRow>>>, ApiError> {
    let rows = solestock_db::list_variants(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn upsert_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<VariantInput>,
) -> Result<Json<ApiResponse<VariantRow>>, ApiError> {
    let row = solestock_db::upsert_variant(&state.pool, id, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}

pub(super) async fn set_variant_stock(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, variant_id)): Path<(i64, i64)>,
    Json(body): Json<StockRequest>,
) -> Result<Json<ApiResponse<VariantRow>>, ApiError> {
    let row = solestock_db::set_variant_stock(&state.pool, id, variant_id, body.stock)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}

pub(super) async fn create_variants_from_size_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<SizeGroupVariantsRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let created = solestock_db::create_variants_from_size_group(
        &state.pool,
        id,
        body.color_id,
        body.size_group_id,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        serde_json::json!({ "created": created }),
        req_id.0,
    ))
}
