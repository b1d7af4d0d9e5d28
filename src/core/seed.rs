//! First-run catalog seeding from `[[categories]]` and `[[products]]` in the config.
//!
//! Seeding is idempotent: entries whose name already exists are skipped, so it
//! is safe to run on every start.

use crate::{
    config::settings::AppConfig,
    core::catalog::{ProductInput, get_category_by_name, get_product_by_name},
    entities::{category, product},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
}

/// Inserts the configured categories and products that do not exist yet.
///
/// # Errors
/// Fails without writing anything if a product entry is invalid or names an
/// unknown category.
pub async fn seed_catalog(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedReport> {
    tracing::info!(
        "Starting catalog seed: {} categories, {} products in config",
        config.categories.len(),
        config.products.len()
    );
    let mut report = SeedReport::default();
    let txn = db.begin().await?;

    for seed in &config.categories {
        if get_category_by_name(&txn, &seed.name).await?.is_some() {
            tracing::debug!("Category '{}' already exists, skipping", seed.name);
            continue;
        }
        category::ActiveModel {
            name: Set(seed.name.clone()),
            description: Set(seed.description.clone()),
            image_url: Set(None),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        report.categories_created += 1;
    }

    for seed in &config.products {
        if get_product_by_name(&txn, &seed.name).await?.is_some() {
            tracing::debug!("Product '{}' already exists, skipping", seed.name);
            continue;
        }

        let category_id = match &seed.category {
            Some(name) => Some(
                get_category_by_name(&txn, name)
                    .await?
                    .ok_or_else(|| {
                        Error::validation(format!(
                            "product '{}' refers to unknown category '{name}'",
                            seed.name
                        ))
                    })?
                    .id,
            ),
            None => None,
        };

        let input = ProductInput {
            name: seed.name.clone(),
            description: seed.description.clone(),
            price: seed.price,
            cost: seed.cost,
            category_id,
            stock: seed.stock,
            featured: seed.featured,
        };
        input.validate()?;

        product::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            cost: Set(input.cost),
            image_url: Set(None),
            category_id: Set(input.category_id),
            stock: Set(input.stock),
            featured: Set(input.featured),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        report.products_created += 1;
    }

    txn.commit().await?;
    tracing::info!(
        categories = report.categories_created,
        products = report.products_created,
        "Catalog seed complete"
    );
    Ok(report)
}
