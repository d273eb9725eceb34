mod admin;
mod orders;
mod payments;
mod products;
mod reviews;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use runmate_core::{AppConfig, ProfanityFilter};
use runmate_db::Page;
use runmate_notify::{Notifier, ReceiptRenderer};
use runmate_payments::PaymentProcessor;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_admin, require_principal, AuthState, RateLimitState,
    RequestId,
};
use crate::workflows::{PageRequest, WorkflowError};

/// Process-wide collaborators, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// `None` when no processor key is configured; checkout then reports
    /// `processor_unavailable`.
    pub payments: Option<Arc<dyn PaymentProcessor>>,
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn ReceiptRenderer>,
    pub filter: Arc<ProfanityFilter>,
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
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct PageData<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    payments: &'static str,
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
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
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
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "payment_incomplete" => StatusCode::PAYMENT_REQUIRED,
            "insufficient_stock" | "already_reviewed" | "invalid_state" | "conflict" => {
                StatusCode::CONFLICT
            }
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "processor_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> PageData<T> {
    pub(super) fn from_page<U>(page: Page<U>, request: PageRequest) -> Self
    where
        U: Into<T>,
    {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: request.page,
            pages: request.pages(page.total),
            limit: request.limit,
        }
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(10).clamp(1, 100)
}

pub(super) fn page_request(query: &PageQuery) -> PageRequest {
    PageRequest {
        page: query.page.unwrap_or(1).max(1),
        limit: normalize_limit(query.limit),
    }
}

pub(super) fn map_db_error(request_id: String, error: &runmate_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Converts a workflow failure into the error envelope. Internal failures
/// are logged and replaced with a generic message.
pub(super) fn map_workflow_error(request_id: String, error: WorkflowError) -> ApiError {
    match error {
        WorkflowError::Internal(detail) => {
            tracing::error!(error = %detail, request_id = %request_id, "request failed");
            ApiError::new(request_id, "internal_error", "internal server error")
        }
        other => ApiError::new(request_id, other.code(), other.to_string()),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/{id}", get(products::get_product))
}

fn authenticated_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", post(products::create_product))
        .route(
            "/api/v1/products/{id}",
            patch(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/v1/products/{id}/photos",
            delete(products::remove_product_photo),
        )
        .route(
            "/api/v1/products/{id}/reviews/{review_id}",
            delete(reviews::delete_review),
        )
        .route(
            "/api/v1/orders",
            get(orders::list_orders).post(orders::place_order),
        )
        .route(
            "/api/v1/orders/{id}",
            get(orders::get_order)
                .patch(orders::update_order_status)
                .delete(orders::delete_order),
        )
        .route(
            "/api/v1/payments/checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/api/v1/payments/confirm", post(payments::confirm_checkout))
        .route("/api/v1/reviews", post(reviews::create_review))
        .route("/api/v1/reviews/{review_id}", put(reviews::update_review))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_principal)),
        )
}

fn admin_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/orders", get(orders::list_orders))
        .route(
            "/api/v1/admin/orders/{id}",
            patch(orders::update_order_status).delete(orders::delete_order),
        )
        .route("/api/v1/admin/users", get(admin::list_users))
        .route(
            "/api/v1/admin/users/{id}",
            patch(admin::update_user).delete(admin::delete_user),
        )
        .route("/api/v1/admin/reviews", get(admin::list_reviews))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_principal))
                .layer(axum::middleware::from_fn(require_admin)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .merge(public_router())
        .merge(authenticated_router(auth.clone(), rate_limit.clone()))
        .merge(admin_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
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
    let payments = if state.payments.is_some() {
        "configured"
    } else {
        "disabled"
    };

    match runmate_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                    payments,
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
                        payments,
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
