//! Bulk import and export of product rows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use solestock_db::ImportRow;
use uuid::Uuid;

use crate::imports::ImportJob;
use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const MAX_IMPORT_ROWS: usize = 5_000;

#[derive(Debug, Deserialize)]
pub(super) struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportStarted {
    job_id: Uuid,
    total: usize,
}

/// POST /api/v1/admin/imports: returns immediately; poll the job for
/// progress.
pub(super) async fn start_import(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImportStarted>>), ApiError> {
    if body.rows.is_empty() || body.rows.len() > MAX_IMPORT_ROWS {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("rows must contain between 1 and {MAX_IMPORT_ROWS} entries"),
        ));
    }

    let total = body.rows.len();
    let job_id = state
        .import_jobs
        .spawn_import(state.pool.clone(), body.rows)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::new(ImportStarted { job_id, total }, req_id.0),
    ))
}

pub(super) async fn get_import(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ImportJob>>, ApiError> {
    let job = state
        .import_jobs
        .get(id)
        .await
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "import job not found"))?;

    Ok(ApiResponse::new(job, req_id.0))
}

/// GET /api/v1/admin/exports/products: one row per variant, in the import
/// shape.
pub(super) async fn export_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ImportRow>>>, ApiError> {
    let rows = solestock_db::export_rows(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}
