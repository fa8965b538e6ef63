//! Public storefront handlers: catalog browsing, availability, and order
//! submission.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use solestock_core::orders::format_share_message;
use solestock_core::{OrderNotification, OrderRequest};
use solestock_db::{Availability, ProductListFilters, ProductRow};

use crate::middleware::RequestId;
use crate::notify::dispatch_in_background;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StoreProductQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderCreated {
    order_id: i64,
    share_message: String,
}

/// GET /api/v1/store/products: active products only.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<StoreProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    let rows = solestock_db::list_products(
        &state.pool,
        ProductListFilters {
            active_only: true,
            category_id: query.category_id,
            search: query.search.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

/// GET /api/v1/store/products/:id: inactive products are hidden.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let product = solestock_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .filter(|p| p.active)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "product not found"))?;

    Ok(ApiResponse::new(product, req_id.0))
}

/// GET /api/v1/store/products/:id/availability
pub(super) async fn get_availability(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Availability>>, ApiError> {
    let availability = solestock_db::get_availability(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(availability, req_id.0))
}

/// POST /api/v1/store/orders: commit a grade-only cart.
///
/// The notification is dispatched after the commit and its outcome never
/// changes this response.
pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<OrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderCreated>>), ApiError> {
    let committed = solestock_db::commit_order(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let share_message = format_share_message(committed.order_id, &committed.order);
    let notification = OrderNotification::from_order(
        committed.order_id,
        &committed.order,
        committed.created_at,
        committed.status,
    );
    dispatch_in_background(state.notifier.clone(), notification);

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(
            OrderCreated {
                order_id: committed.order_id,
                share_message,
            },
            req_id.0,
        ),
    ))
}
