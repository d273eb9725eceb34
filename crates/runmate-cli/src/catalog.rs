//! `seed` command: loads a catalog file and inserts its products.

use std::path::Path;

use anyhow::Context;
use sqlx::PgPool;

pub(crate) async fn run_seed(pool: &PgPool, path: &Path, owner_email: &str) -> anyhow::Result<()> {
    let catalog = runmate_core::load_catalog(path)
        .with_context(|| format!("loading catalog from {}", path.display()))?;

    let owner = runmate_db::get_user_by_email(pool, owner_email)
        .await?
        .with_context(|| format!("no user with email {owner_email}"))?;

    tracing::info!(
        products = catalog.products.len(),
        owner = %owner.id,
        "seeding catalog"
    );
    let summary = runmate_db::seed_catalog(pool, owner.id, &catalog.products).await?;

    println!(
        "seeded {} product(s), skipped {} already present",
        summary.inserted, summary.skipped
    );
    Ok(())
}
