use runmate_core::{validate_review_input, Principal, Review};
use runmate_db::{NewReview, ReviewRow};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;

use super::{authorize, WorkflowError};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewInput {
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

/// Reviews one delivered order line owned by the caller.
pub async fn create_review(
    state: &AppState,
    principal: &Principal,
    input: CreateReviewInput,
) -> Result<Review, WorkflowError> {
    let comment = clean_comment(state, input.rating, &input.comment)?;
    let row = runmate_db::create_review(
        &state.pool,
        &NewReview {
            user_id: principal.user_id,
            order_id: input.order_id,
            order_item_id: input.order_item_id,
            rating: input.rating,
            comment: &comment,
        },
    )
    .await?;

    tracing::info!(review_id = %row.id, product_id = %row.product_id, rating = row.rating, "review created");
    Ok(row.into())
}

/// Only the author may edit a review.
pub async fn update_review(
    state: &AppState,
    principal: &Principal,
    review_id: Uuid,
    input: UpdateReviewInput,
) -> Result<Review, WorkflowError> {
    let existing = find_review(state, review_id).await?;
    if existing.user_id != principal.user_id {
        return Err(WorkflowError::Forbidden(
            "only the author can edit this review".to_string(),
        ));
    }

    let comment = clean_comment(state, input.rating, &input.comment)?;
    let row = runmate_db::update_review(&state.pool, review_id, input.rating, &comment)
        .await?
        .ok_or_else(|| review_not_found(review_id))?;
    Ok(row.into())
}

/// Author or admin. The review must belong to `product_id`.
pub async fn delete_review(
    state: &AppState,
    principal: &Principal,
    product_id: Uuid,
    review_id: Uuid,
) -> Result<Review, WorkflowError> {
    let existing = find_review(state, review_id).await?;
    if existing.product_id != product_id {
        return Err(review_not_found(review_id));
    }
    authorize(principal, existing.user_id, "delete this review")?;

    let row = runmate_db::delete_review(&state.pool, review_id)
        .await?
        .ok_or_else(|| review_not_found(review_id))?;
    tracing::info!(review_id = %review_id, product_id = %product_id, "review deleted");
    Ok(row.into())
}

fn clean_comment(state: &AppState, rating: i16, comment: &str) -> Result<String, WorkflowError> {
    let comment = validate_review_input(rating, comment)?;
    Ok(state.filter.clean(&comment))
}

async fn find_review(state: &AppState, review_id: Uuid) -> Result<ReviewRow, WorkflowError> {
    runmate_db::get_review(&state.pool, review_id)
        .await?
        .ok_or_else(|| review_not_found(review_id))
}

fn review_not_found(id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("review {id} not found"))
}
