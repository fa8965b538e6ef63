use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use solestock_core::OrderStatus;
use solestock_db::{OrderDetail, OrderRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct OrderQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    pub status: String,
}

fn parse_status(req_id: &str, value: &str) -> Result<OrderStatus, ApiError> {
    value.parse::<OrderStatus>().map_err(|_| {
        let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
        ApiError::new(
            req_id,
            "validation_error",
            format!(
                "status must be one of {}, got '{value}'",
                allowed.join(", ")
            ),
        )
    })
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<Vec<OrderRow>>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| parse_status(&req_id.0, s))
        .transpose()?;

    let rows = solestock_db::list_orders(&state.pool, status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>, ApiError> {
    let detail = solestock_db::get_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(detail, req_id.0))
}

pub(super) async fn update_order_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<OrderRow>>, ApiError> {
    let status = parse_status(&req_id.0, &body.status)?;
    let row = solestock_db::update_order_status(&state.pool, id, status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(order_id = id, status = %status, "order status updated");
    Ok(ApiResponse::new(row, req_id.0))
}
