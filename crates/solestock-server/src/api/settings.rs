use axum::{extract::State, Extension, Json};
use solestock_db::{StoreSettingsInput, StoreSettingsRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

fn is_css_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|d| matches!(d.len(), 3 | 6) && d.chars().all(|c| c.is_ascii_hexdigit()))
}

/// GET /api/v1/store/settings: public theming data.
pub(super) async fn get_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StoreSettingsRow>>, ApiError> {
    let row = solestock_db::get_store_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(row, req_id.0))
}

pub(super) async fn update_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StoreSettingsInput>,
) -> Result<Json<ApiResponse<StoreSettingsRow>>, ApiError> {
    for (field, value) in [
        ("primary_color", &body.primary_color),
        ("secondary_color", &body.secondary_color),
    ] {
        if !is_css_color(value) {
            return Err(ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("{field} must look like #RRGGBB, got '{value}'"),
            ));
        }
    }

    let row = solestock_db::update_store_settings(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!("store settings updated");
    Ok(ApiResponse::new(row, req_id.0))
}

#[cfg(test)]
mod tests {
    use super::is_css_color;

    #[test]
    fn css_colors_need_hash_and_hex_digits() {
        assert!(is_css_color("#111827"));
        assert!(is_css_color("#fff"));
        assert!(!is_css_color("111827"));
        assert!(!is_css_color("#12345"));
        assert!(!is_css_color("#zzzzzz"));
    }
}
