mod catalog;
mod customers;
mod grades;
mod imports;
mod orders;
mod products;
mod settings;
mod store;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use solestock_db::{DbError, GradeSource};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::imports::ImportJobStore;
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::notify::OrderNotifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Detected once at startup; see [`solestock_db::detect_grade_source`].
    pub grade_source: GradeSource,
    pub notifier: Arc<dyn OrderNotifier>,
    pub import_jobs: ImportJobStore,
    pub sample_grades_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(flatten)]
    pub shortfall: Option<StockShortfall>,
}

/// Which variant ran short, so the storefront can explain the rejection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StockShortfall {
    pub product: String,
    pub size: String,
    pub required: i64,
    pub available: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                shortfall: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" | "insufficient_stock" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "resource not found"),
        DbError::Validation(message) => ApiError::new(request_id, "validation_error", message),
        DbError::Conflict(message) => ApiError::new(request_id, "conflict", message),
        DbError::InsufficientStock {
            product,
            size,
            required,
            available,
        } => {
            tracing::info!(error = %error, "order rejected for insufficient stock");
            let mut api_error = ApiError::new(request_id, "insufficient_stock", error.to_string());
            api_error.error.shortfall = Some(StockShortfall {
                product: product.clone(),
                size: size.clone(),
                required: *required,
                available: *available,
            });
            api_error
        }
        e if solestock_db::is_unique_violation(e) => {
            ApiError::new(request_id, "conflict", "a record with that name already exists")
        }
        e if solestock_db::is_foreign_key_violation(e) => ApiError::new(
            request_id,
            "validation_error",
            "referenced record does not exist or is still in use",
        ),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn storefront_router(rate_limit: RateLimitState) -> Router<AppState> {
    let orders = Router::new()
        .route("/api/v1/store/orders", post(store::create_order))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new()
        .route("/api/v1/store/settings", get(settings::get_settings))
        .route("/api/v1/store/products", get(store::list_products))
        .route("/api/v1/store/products/{id}", get(store::get_product))
        .route(
            "/api/v1/store/products/{id}/availability",
            get(store::get_availability),
        )
        .route("/api/v1/store/customers", post(customers::register_customer))
        .merge(orders)
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/v1/admin/categories/{id}",
            delete(catalog::delete_category),
        )
        .route(
            "/api/v1/admin/colors",
            get(catalog::list_colors).post(catalog::create_color),
        )
        .route("/api/v1/admin/colors/{id}", delete(catalog::delete_color))
        .route(
            "/api/v1/admin/sizes",
            get(catalog::list_sizes).post(catalog::create_size),
        )
        .route("/api/v1/admin/sizes/{id}", delete(catalog::delete_size))
        .route(
            "/api/v1/admin/size-groups",
            get(catalog::list_size_groups).post(catalog::create_size_group),
        )
        .route(
            "/api/v1/admin/size-groups/{id}",
            delete(catalog::delete_size_group),
        )
        .route(
            "/api/v1/admin/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/admin/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::deactivate_product),
        )
        .route(
            "/api/v1/admin/products/{id}/variants",
            get(products::list_variants).post(products::upsert_variant),
        )
        .route(
            "/api/v1/admin/products/{id}/variants/from-size-group",
            post(products::create_variants_from_size_group),
        )
        .route(
            "/api/v1/admin/products/{id}/variants/{variant_id}/stock",
            put(products::set_variant_stock),
        )
        .route(
            "/api/v1/admin/products/{id}/grade-assignments",
            get(grades::list_assignments)
                .post(grades::assign_grade)
                .delete(grades::unassign_grade),
        )
        .route(
            "/api/v1/admin/grades",
            get(grades::list_grades).post(grades::create_grade),
        )
        .route("/api/v1/admin/grades/seed", post(grades::seed_grades))
        .route(
            "/api/v1/admin/grades/{id}",
            get(grades::get_grade)
                .put(grades::update_grade)
                .delete(grades::delete_grade),
        )
        .route("/api/v1/admin/customers", get(customers::list_customers))
        .route(
            "/api/v1/admin/customers/{id}/approval",
            put(customers::approve_customer),
        )
        .route(
            "/api/v1/admin/customers/{id}/minimum-order",
            put(customers::set_minimum_order),
        )
        .route("/api/v1/admin/orders", get(orders::list_orders))
        .route("/api/v1/admin/orders/{id}", get(orders::get_order))
        .route(
            "/api/v1/admin/orders/{id}/status",
            put(orders::update_order_status),
        )
        .route("/api/v1/admin/settings", put(settings::update_settings))
        .route("/api/v1/admin/imports", post(imports::start_import))
        .route("/api/v1/admin/imports/{id}", get(imports::get_import))
        .route(
            "/api/v1/admin/exports/products",
            get(imports::export_products),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(storefront_router(rate_limit))
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match solestock_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

/// Order submissions allowed per client per minute.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(60, Duration::from_secs(60))
}
