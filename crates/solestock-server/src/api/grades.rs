//! Admin handlers for grade templates and their (product, color)
//! assignments.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use solestock_core::TemplateInput;
use solestock_db::{AssignmentRow, GradeDetail, GradeRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct GradeRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub templates: Vec<TemplateInput>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(super) struct AssignmentRequest {
    pub color_id: i64,
    pub grade_id: i64,
}

/// GET /api/v1/admin/grades: reads whichever grade table this deployment
/// has; an environment without one gets an empty list.
pub(super) async fn list_grades(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<GradeRow>>>, ApiError> {
    let rows = solestock_db::list_grades(&state.pool, state.grade_source)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

pub(super) async fn get_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<GradeDetail>>, ApiError> {
    let detail = solestock_db::get_grade(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(detail, req_id.0))
}

pub(super) async fn create_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GradeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GradeDetail>>), ApiError> {
    let detail = solestock_db::create_grade(
        &state.pool,
        &body.name,
        body.description.as_deref(),
        body.active,
        &body.templates,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((StatusCode::CREATED, ApiResponse::new(detail, req_id.0)))
}

/// PUT /api/v1/admin/grades/:id: replaces the whole template.
pub(super) async fn update_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<GradeRequest>,
) -> Result<Json<ApiResponse<GradeDetail>>, ApiError> {
    let detail = solestock_db::update_grade(
        &state.pool,
        id,
        &body.name,
        body.description.as_deref(),
        body.active,
        &body.templates,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(detail, req_id.0))
}

pub(super) async fn delete_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    solestock_db::delete_grade(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/grades/seed: load the configured sample grades.
pub(super) async fn seed_grades(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let file = solestock_core::load_sample_grades(&state.sample_grades_path).map_err(|e| {
        tracing::warn!(error = %e, "sample grades file rejected");
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
    })?;

    let seeded = solestock_db::seed_sample_grades(&state.pool, &file)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        serde_json::json!({ "seeded": seeded }),
        req_id.0,
    ))
}

pub(super) async fn list_assignments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<AssignmentRow>>>, ApiError> {
    let rows = solestock_db::list_assignments(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(rows, req_id.0))
}

/// POST /api/v1/admin/products/:id/grade-assignments: idempotent.
pub(super) async fn assign_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
    Json(body): Json<AssignmentRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let created =
        solestock_db::assign_grade(&state.pool, product_id, body.color_id, body.grade_id)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        serde_json::json!({ "assigned": true, "created": created }),
        req_id.0,
    ))
}

pub(super) async fn unassign_grade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
    Json(body): Json<AssignmentRequest>,
) -> Result<StatusCode, ApiError> {
    solestock_db::unassign_grade(&state.pool, product_id, body.color_id, body.grade_id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
