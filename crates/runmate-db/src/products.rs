//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use runmate_core::{NewProduct, Product, ProductDetail, ProductPatch};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::{reviews, DbError, Page};

const PRODUCT_COLUMNS: &str = "id, name, description, category, price, stock, photos, rating, \
     num_reviews, created_by, created_at, updated_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub photos: Vec<String>,
    pub rating: Decimal,
    pub num_reviews: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            stock: row.stock,
            photos: row.photos,
            rating: row.rating.normalize(),
            num_reviews: row.num_reviews,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Optional filters for [`list_products`]. `None` fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters<'a> {
    pub category: Option<&'a str>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<&'a str>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    pub limit: i64,
    pub offset: i64,
}

/// Inserts a product owned by `created_by`. The input is expected to have
/// passed [`NewProduct::normalize`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product<'e, E>(
    executor: E,
    created_by: Uuid,
    product: &NewProduct,
) -> Result<ProductRow, DbError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "INSERT INTO products (id, name, description, category, price, stock, photos, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.photos)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns a product together with its reviews, newest review first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn get_product_detail(pool: &PgPool, id: Uuid) -> Result<Option<ProductDetail>, DbError> {
    let Some(row) = get_product(pool, id).await? else {
        return Ok(None);
    };
    let reviews = reviews::list_product_reviews(pool, id).await?;

    Ok(Some(ProductDetail {
        product: row.into(),
        reviews: reviews.into_iter().map(Into::into).collect(),
    }))
}

/// Lists products matching `filters`, newest first, with the total number of
/// matches ignoring pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: &ProductFilters<'_>,
) -> Result<Page<ProductRow>, DbError> {
    const WHERE_CLAUSE: &str = "WHERE ($1::TEXT IS NULL OR category = $1) \
           AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%') \
           AND ($3::NUMERIC IS NULL OR price >= $3) \
           AND ($4::NUMERIC IS NULL OR price <= $4) \
           AND ($5::NUMERIC IS NULL OR rating >= $5)";

    let search = filters
        .search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(escape_like);

    let total: i64 = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM products {WHERE_CLAUSE}"
    ))
    .bind(filters.category)
    .bind(search.as_deref())
    .bind(filters.min_price)
    .bind(filters.max_price)
    .bind(filters.min_rating)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products {WHERE_CLAUSE} \
         ORDER BY created_at DESC, id \
         LIMIT $6 OFFSET $7"
    ))
    .bind(filters.category)
    .bind(search.as_deref())
    .bind(filters.min_price)
    .bind(filters.max_price)
    .bind(filters.min_rating)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(Page { items, total })
}

/// Applies a sparse update. New photos are appended unless
/// `patch.replace_photos` is set. Returns `None` if the product does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    patch: &ProductPatch,
) -> Result<Option<ProductRow>, DbError> {
    let sql = format!(
        "UPDATE products SET \
             name        = COALESCE($2, name), \
             description = COALESCE($3, description), \
             category    = COALESCE($4, category), \
             price       = COALESCE($5, price), \
             stock       = COALESCE($6, stock), \
             photos      = CASE \
                               WHEN $7::TEXT[] IS NULL THEN photos \
                               WHEN $8 THEN $7 \
                               ELSE photos || $7 \
                           END, \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.category.as_deref())
        .bind(patch.price)
        .bind(patch.stock)
        .bind(patch.photos.as_deref())
        .bind(patch.replace_photos)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Deletes a product. Order lines that referenced it keep their name and
/// price snapshot with a null product reference.
///
/// Returns `false` if no row matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes every occurrence of `photo` from the product's photo list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn remove_product_photo(
    pool: &PgPool,
    id: Uuid,
    photo: &str,
) -> Result<Option<ProductRow>, DbError> {
    let sql = format!(
        "UPDATE products SET photos = array_remove(photos, $2), updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .bind(photo)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
