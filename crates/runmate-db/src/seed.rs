use runmate_core::NewProduct;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{products::insert_product, DbError};

/// Counts from one [`seed_catalog`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    /// Products skipped because one with the same name (ignoring case) exists.
    pub skipped: usize,
}

/// Insert catalog products owned by `owner_id`, skipping names already present.
///
/// All inserts run inside a single transaction; if any operation fails the
/// entire batch is rolled back. Re-running with the same file is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(
    pool: &PgPool,
    owner_id: Uuid,
    products: &[NewProduct],
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for product in products {
        let exists: bool = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE LOWER(name) = LOWER($1))",
        )
        .bind(&product.name)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            summary.skipped += 1;
            continue;
        }

        insert_product(&mut *tx, owner_id, product).await?;
        summary.inserted += 1;
    }

    tx.commit().await?;
    Ok(summary)
}
