use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use runmate_core::{NewProduct, Principal, Product, ProductDetail, ProductPatch};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::workflows::catalog::{self, ProductSearch};

use super::{map_workflow_error, page_request, ApiError, ApiResponse, AppState, PageData, PageQuery};

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub category: Option<String>,
    #[serde(alias = "keyword")]
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RemovePhotoRequest {
    pub photo_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedProduct {
    id: Uuid,
    deleted: bool,
}

/// GET /api/v1/products
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<PageData<Product>>>, ApiError> {
    let page = page_request(&PageQuery {
        page: query.page,
        limit: query.limit,
    });
    let search = ProductSearch {
        category: query.category,
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
        min_rating: query.min_rating,
    };

    let result = catalog::list_products(&state.pool, &search, page)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        PageData::from_page(result, page),
    )))
}

/// GET /api/v1/products/{id}
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let detail = catalog::get_product(&state.pool, id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, detail)))
}

/// POST /api/v1/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let product = catalog::create_product(&state.pool, &principal, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, product))))
}

/// PATCH /api/v1/products/{id}
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductPatch>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = catalog::update_product(&state.pool, &principal, id, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, product)))
}

/// DELETE /api/v1/products/{id}
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedProduct>>, ApiError> {
    catalog::delete_product(&state.pool, &principal, id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(
        req_id.0,
        DeletedProduct { id, deleted: true },
    )))
}

/// DELETE /api/v1/products/{id}/photos
pub(super) async fn remove_product_photo(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<RemovePhotoRequest>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = catalog::remove_product_photo(&state.pool, &principal, id, &body.photo_url)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, product)))
}
