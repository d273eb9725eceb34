//! Order handlers. The admin routes reuse these; the admin guard has already
//! upgraded the principal by the time they run.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use runmate_core::{Order, OrderStatus, PaymentStatus, Principal};
use runmate_db::StatusUpdate;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::workflows::orders::{self as workflow, PlaceOrderInput};

use super::{map_workflow_error, page_request, ApiError, ApiResponse, AppState, PageData, PageQuery};

#[derive(Debug, Deserialize)]
pub(super) struct OrderQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusUpdateRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

fn parse_status_update(req_id: &str, body: &StatusUpdateRequest) -> Result<StatusUpdate, ApiError> {
    let status = body
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))?;
    let payment_status = body
        .payment_status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))?;
    Ok(StatusUpdate {
        status,
        payment_status,
    })
}

/// POST /api/v1/orders
pub(super) async fn place_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PlaceOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ApiError> {
    let order = workflow::place_order(&state, &principal, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, order))))
}

/// GET /api/v1/orders and GET /api/v1/admin/orders
pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<PageData<Order>>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let page = page_request(&PageQuery {
        page: query.page,
        limit: query.limit,
    });

    let result = workflow::list_orders(&state, &principal, status, page)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(
        req_id.0,
        PageData::from_page(result, page),
    )))
}

/// GET /api/v1/orders/{id}
pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = workflow::get_order(&state, &principal, id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, order)))
}

/// PATCH /api/v1/orders/{id} and PATCH /api/v1/admin/orders/{id}
pub(super) async fn update_order_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let update = parse_status_update(&req_id.0, &body)?;
    let order = workflow::update_order_status(&state, &principal, id, update)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, order)))
}

/// DELETE /api/v1/orders/{id} and DELETE /api/v1/admin/orders/{id}
pub(super) async fn delete_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = workflow::delete_order(&state, &principal, id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, order)))
}
