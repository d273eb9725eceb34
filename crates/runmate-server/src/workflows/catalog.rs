use runmate_core::{NewProduct, Principal, Product, ProductDetail, ProductPatch};
use runmate_db::{Page, ProductFilters};
use sqlx::PgPool;
use uuid::Uuid;

use super::{authorize, PageRequest, WorkflowError};

/// Query parameters accepted by the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductSearch {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<rust_decimal::Decimal>,
    pub max_price: Option<rust_decimal::Decimal>,
    pub min_rating: Option<rust_decimal::Decimal>,
}

pub async fn create_product(
    pool: &PgPool,
    principal: &Principal,
    mut product: NewProduct,
) -> Result<Product, WorkflowError> {
    product.normalize()?;
    let row = runmate_db::insert_product(pool, principal.user_id, &product).await?;
    tracing::info!(product_id = %row.id, user_id = %principal.user_id, "product created");
    Ok(row.into())
}

pub async fn list_products(
    pool: &PgPool,
    search: &ProductSearch,
    page: PageRequest,
) -> Result<Page<Product>, WorkflowError> {
    if let (Some(min), Some(max)) = (search.min_price, search.max_price) {
        if min > max {
            return Err(WorkflowError::ValidationFailed(
                "min_price cannot exceed max_price".to_string(),
            ));
        }
    }

    let filters = ProductFilters {
        category: non_blank(search.category.as_deref()),
        search: non_blank(search.search.as_deref()),
        min_price: search.min_price,
        max_price: search.max_price,
        min_rating: search.min_rating,
        limit: page.limit,
        offset: page.offset(),
    };
    let page = runmate_db::list_products(pool, &filters).await?;

    Ok(Page {
        items: page.items.into_iter().map(Product::from).collect(),
        total: page.total,
    })
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<ProductDetail, WorkflowError> {
    runmate_db::get_product_detail(pool, id)
        .await?
        .ok_or_else(|| product_not_found(id))
}

pub async fn update_product(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
    mut patch: ProductPatch,
) -> Result<Product, WorkflowError> {
    patch.normalize()?;
    if patch.is_empty() {
        return Err(WorkflowError::ValidationFailed(
            "no fields to update".to_string(),
        ));
    }

    owned_product(pool, principal, id, "update this product").await?;
    let row = runmate_db::update_product(pool, id, &patch)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    Ok(row.into())
}

pub async fn delete_product(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
) -> Result<(), WorkflowError> {
    owned_product(pool, principal, id, "delete this product").await?;
    if !runmate_db::delete_product(pool, id).await? {
        return Err(product_not_found(id));
    }
    tracing::info!(product_id = %id, user_id = %principal.user_id, "product deleted");
    Ok(())
}

pub async fn remove_product_photo(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
    photo_url: &str,
) -> Result<Product, WorkflowError> {
    let photo_url = photo_url.trim();
    if photo_url.is_empty() {
        return Err(WorkflowError::ValidationFailed(
            "photo url is required".to_string(),
        ));
    }

    let product = owned_product(pool, principal, id, "edit this product").await?;
    if !product.photos.iter().any(|p| p == photo_url) {
        return Err(WorkflowError::NotFound(format!(
            "photo {photo_url} not found on product {id}"
        )));
    }

    let row = runmate_db::remove_product_photo(pool, id, photo_url)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    Ok(row.into())
}

async fn owned_product(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
    action: &str,
) -> Result<Product, WorkflowError> {
    let product: Product = runmate_db::get_product(pool, id)
        .await?
        .ok_or_else(|| product_not_found(id))?
        .into();
    authorize(principal, product.created_by, action)?;
    Ok(product)
}

fn product_not_found(id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("product {id} not found"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
