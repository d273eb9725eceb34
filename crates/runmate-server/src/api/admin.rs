//! Back-office listings and user administration. Order status and deletion
//! aliases live in `orders`.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use runmate_core::{Principal, Review, User, UserPatch};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::workflows::users as workflow;

use super::{
    map_db_error, map_workflow_error, page_request, ApiError, ApiResponse, AppState, PageData,
    PageQuery,
};

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    #[serde(alias = "keyword")]
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/admin/users
pub(super) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<PageData<User>>>, ApiError> {
    let page = page_request(&PageQuery {
        page: query.page,
        limit: query.limit,
    });
    let result = workflow::list_users(&state.pool, query.search.as_deref(), page)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(
        req_id.0,
        PageData::from_page(result, page),
    )))
}

/// PATCH /api/v1/admin/users/{id}
pub(super) async fn update_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserPatch>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = workflow::update_user(&state.pool, &principal, id, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, user)))
}

/// DELETE /api/v1/admin/users/{id}
pub(super) async fn delete_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = workflow::delete_user(&state.pool, &principal, id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, user)))
}

/// GET /api/v1/admin/reviews
pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageData<Review>>>, ApiError> {
    let page = page_request(&query);
    let result = runmate_db::list_reviews(&state.pool, page.limit, page.offset())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(
        req_id.0,
        PageData::from_page(result, page),
    )))
}
