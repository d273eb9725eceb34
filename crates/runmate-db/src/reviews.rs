//! Database operations for `reviews` and the product rating aggregate.
//!
//! Every mutation recomputes `products.rating` / `products.num_reviews` from
//! the remaining reviews inside the same transaction, with the product row
//! locked so concurrent review changes cannot interleave their aggregates.

use chrono::{DateTime, Utc};
use runmate_core::{OrderStatus, RatingAggregate, Review};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbError, Page};

const REVIEW_SELECT: &str = "SELECT r.id, r.product_id, r.user_id, u.name AS user_name, \
            r.order_item_id, r.rating, r.comment, r.created_at \
     FROM reviews r \
     LEFT JOIN users u ON u.id = r.user_id";

/// A row from `reviews`, joined with the reviewer's display name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub order_item_id: Option<Uuid>,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            user_name: row.user_name,
            order_item_id: row.order_item_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Input for [`create_review`]. The comment is stored as given; cleaning and
/// range checks happen before this point.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub rating: i16,
    pub comment: &'a str,
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewableItem {
    product_id: Option<Uuid>,
    is_reviewed: bool,
    owner_id: Uuid,
    status: String,
}

/// Reviews one line of a delivered order.
///
/// In one transaction: checks the line belongs to a delivered order owned by
/// the reviewer, flips `is_reviewed` (only if it was false), inserts the
/// review and recomputes the product's rating aggregate.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the line does not exist, is not on a
/// delivered order owned by `user_id`, or its product was deleted;
/// [`DbError::AlreadyReviewed`] if the line already has a review.
pub async fn create_review(pool: &PgPool, review: &NewReview<'_>) -> Result<ReviewRow, DbError> {
    let mut tx = pool.begin().await?;

    let item = sqlx::query_as::<_, ReviewableItem>(
        "SELECT oi.product_id, oi.is_reviewed, o.user_id AS owner_id, o.status \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE oi.id = $1 AND oi.order_id = $2 \
         FOR UPDATE OF oi",
    )
    .bind(review.order_item_id)
    .bind(review.order_id)
    .fetch_optional(&mut *tx)
    .await?
    .filter(|item| {
        item.owner_id == review.user_id && item.status == OrderStatus::Delivered.as_str()
    })
    .ok_or_else(|| DbError::not_found("delivered order item", review.order_item_id))?;

    if item.is_reviewed {
        return Err(DbError::AlreadyReviewed {
            order_item_id: review.order_item_id,
        });
    }
    let product_id = item
        .product_id
        .ok_or_else(|| DbError::not_found("product", review.order_item_id))?;

    lock_product(&mut tx, product_id).await?;

    let flagged = sqlx::query(
        "UPDATE order_items SET is_reviewed = TRUE WHERE id = $1 AND is_reviewed = FALSE",
    )
    .bind(review.order_item_id)
    .execute(&mut *tx)
    .await?;
    if flagged.rows_affected() == 0 {
        return Err(DbError::AlreadyReviewed {
            order_item_id: review.order_item_id,
        });
    }

    let review_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO reviews (id, product_id, user_id, order_item_id, rating, comment) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(review_id)
    .bind(product_id)
    .bind(review.user_id)
    .bind(review.order_item_id)
    .bind(review.rating)
    .bind(review.comment)
    .execute(&mut *tx)
    .await?;

    recompute_rating(&mut tx, product_id).await?;
    let row = fetch_review(&mut tx, review_id)
        .await?
        .ok_or_else(|| DbError::not_found("review", review_id))?;
    tx.commit().await?;

    Ok(row)
}

/// Rewrites a review's rating and comment, refreshes its timestamp and
/// recomputes the product aggregate. Returns `None` if the review is gone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails.
pub async fn update_review(
    pool: &PgPool,
    review_id: Uuid,
    rating: i16,
    comment: &str,
) -> Result<Option<ReviewRow>, DbError> {
    let mut tx = pool.begin().await?;

    let product_id: Option<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT product_id FROM reviews WHERE id = $1")
            .bind(review_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(product_id) = product_id else {
        return Ok(None);
    };
    lock_product(&mut tx, product_id).await?;

    sqlx::query("UPDATE reviews SET rating = $2, comment = $3, created_at = NOW() WHERE id = $1")
        .bind(review_id)
        .bind(rating)
        .bind(comment)
        .execute(&mut *tx)
        .await?;

    recompute_rating(&mut tx, product_id).await?;
    let row = fetch_review(&mut tx, review_id).await?;
    tx.commit().await?;

    Ok(row)
}

/// Deletes a review and recomputes the product aggregate, which drops to
/// `0 / 0` when the last review goes. Returns the deleted review.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails.
pub async fn delete_review(pool: &PgPool, review_id: Uuid) -> Result<Option<ReviewRow>, DbError> {
    let mut tx = pool.begin().await?;

    let Some(existing) = fetch_review(&mut tx, review_id).await? else {
        return Ok(None);
    };
    lock_product(&mut tx, existing.product_id).await?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(&mut *tx)
        .await?;

    recompute_rating(&mut tx, existing.product_id).await?;
    tx.commit().await?;

    Ok(Some(existing))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, review_id: Uuid) -> Result<Option<ReviewRow>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_review(&mut conn, review_id).await
}

/// Reviews for one product, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_reviews(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every review across the catalog, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_reviews(pool: &PgPool, limit: i64, offset: i64) -> Result<Page<ReviewRow>, DbError> {
    let total: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, ReviewRow>(&format!(
        "{REVIEW_SELECT} ORDER BY r.created_at DESC, r.id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page { items, total })
}

async fn fetch_review(conn: &mut PgConnection, review_id: Uuid) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
        .bind(review_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub(crate) async fn lock_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<(), DbError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("product", product_id))?;

    Ok(())
}

pub(crate) async fn recompute_rating(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<RatingAggregate, DbError> {
    let ratings: Vec<i16> =
        sqlx::query_scalar::<_, i16>("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

    let aggregate = RatingAggregate::from_ratings(&ratings);
    sqlx::query(
        "UPDATE products SET rating = $2, num_reviews = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .bind(aggregate.rating)
    .bind(aggregate.num_reviews)
    .execute(&mut *conn)
    .await?;

    Ok(aggregate)
}
