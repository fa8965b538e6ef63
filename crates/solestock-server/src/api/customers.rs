use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use solestock_core::CustomerInput;
use solestock_db::CustomerRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CustomerQuery {
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApprovalRequest {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct MinimumOrderRequest {
    pub minimum_order: Option<Decimal>,
}

/// POST /api/v1/store/customers: self-registration; new accounts start
/// unapproved.
pub(super) async fn register_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CustomerInput>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerRow>>), ApiError> {
    let row = solestock_db::register_customer(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(customer_id = row.id, "customer registered");
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

pub(super) async fn list_customers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<ApiResponse<Vec<CustomerRow>>>, ApiError> {
    let rows = solestock_db::list_customers(&state.pool, query.approved)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn approve_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ApprovalRequest>,
) -> Result<Json<ApiResponse<CustomerRow>>, ApiError> {
    let row = solestock_db::approve_customer(&state.pool, id, body.approved)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}

/// PUT /api/v1/admin/customers/:id/minimum-order: `null` clears the
/// override.
pub(super) async fn set_minimum_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<MinimumOrderRequest>,
) -> Result<Json<ApiResponse<CustomerRow>>, ApiError> {
    let row = solestock_db::set_customer_minimum_order(&state.pool, id, body.minimum_order)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}
