use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use runmate_core::{Principal, Review};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::workflows::reviews::{self as workflow, CreateReviewInput, UpdateReviewInput};

use super::{map_workflow_error, ApiError, ApiResponse, AppState};

/// POST /api/v1/reviews
pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateReviewInput>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    let review = workflow::create_review(&state, &principal, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, review))))
}

/// PUT /api/v1/reviews/{review_id}
pub(super) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(review_id): Path<Uuid>,
    Json(body): Json<UpdateReviewInput>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = workflow::update_review(&state, &principal, review_id, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, review)))
}

/// DELETE /api/v1/products/{id}/reviews/{review_id}
pub(super) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path((product_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = workflow::delete_review(&state, &principal, product_id, review_id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, review)))
}
