use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    /// Display name of the reviewer at read time, when known.
    pub user_name: Option<String>,
    /// The order line this review was written for.
    pub order_item_id: Option<Uuid>,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Derived `rating` / `num_reviews` pair stored on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingAggregate {
    pub rating: Decimal,
    pub num_reviews: i32,
}

impl RatingAggregate {
    pub const EMPTY: RatingAggregate = RatingAggregate {
        rating: Decimal::ZERO,
        num_reviews: 0,
    };

    /// Arithmetic mean of `ratings` at full decimal precision, `0` when empty.
    #[must_use]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self::EMPTY;
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let count = i32::try_from(ratings.len()).unwrap_or(i32::MAX);
        let mean = Decimal::from(sum) / Decimal::from(count);
        Self {
            rating: mean.normalize(),
            num_reviews: count,
        }
    }
}

/// Validates a rating and a comment, returning the trimmed comment.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the rating is outside `1..=5` or the
/// comment is blank.
pub fn validate_review_input(rating: i16, comment: &str) -> Result<String, CoreError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("comment is required".to_string()));
    }
    Ok(trimmed.to_string())
}
