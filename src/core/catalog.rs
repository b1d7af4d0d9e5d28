//! Catalog business logic - products and categories.
//!
//! Reads are open to everyone. Writes require an admin, checked against the
//! caller's profile after the input has been validated.

use crate::{
    core::{
        profile::require_admin,
        storage::{ImageBucket, StoredImage},
    },
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{Order, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Number of featured products shown on the home page
pub const DEFAULT_FEATURED_LIMIT: u64 = 8;

/// Editable product fields, shared by create and update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub cost: Option<f64>,
    pub category_id: Option<i64>,
    pub stock: i32,
    pub featured: bool,
}

impl ProductInput {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Product name cannot be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::InvalidAmount { amount: self.price });
        }
        if let Some(cost) = self.cost.filter(|c| !c.is_finite() || *c < 0.0) {
            return Err(Error::InvalidAmount { amount: cost });
        }
        if self.stock < 0 {
            return Err(Error::InvalidQuantity {
                quantity: self.stock,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Price,
    CreatedAt,
}

/// Filters of the product listing page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: SortField,
    pub descending: bool,
}

/// Lists all categories ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_category_by_name<C>(db: &C, name: &str) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a category. Admin only.
pub async fn create_category(
    db: &DatabaseConnection,
    actor_id: i64,
    name: &str,
    description: Option<String>,
) -> Result<category::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    require_admin(db, actor_id, "create category").await?;

    category::ActiveModel {
        name: Set(name.trim().to_string()),
        description: Set(description),
        image_url: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Featured products for the home page, newest first.
pub async fn featured_products(
    db: &DatabaseConnection,
    limit: Option<u64>,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::Featured.eq(true))
        .order_by_desc(product::Column::CreatedAt)
        .limit(limit.unwrap_or(DEFAULT_FEATURED_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of related products shown on a product page
pub const DEFAULT_RELATED_LIMIT: u64 = 4;

/// Other products in the same category as `product`.
///
/// A product without a category has no related products.
pub async fn related_products(
    db: &DatabaseConnection,
    product: &product::Model,
    limit: Option<u64>,
) -> Result<Vec<product::Model>> {
    let Some(category_id) = product.category_id else {
        return Ok(Vec::new());
    };
    Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .filter(product::Column::Id.ne(product.id))
        .order_by_asc(product::Column::Id)
        .limit(limit.unwrap_or(DEFAULT_RELATED_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Searches the catalog with the listing page filters.
pub async fn search_products(
    db: &DatabaseConnection,
    query: &ProductQuery,
) -> Result<Vec<product::Model>> {
    let mut select = Product::find();

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        select = select.filter(product::Column::Name.contains(term));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(min) = query.min_price {
        select = select.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        select = select.filter(product::Column::Price.lte(max));
    }

    let column = match query.sort_by {
        SortField::Name => product::Column::Name,
        SortField::Price => product::Column::Price,
        SortField::CreatedAt => product::Column::CreatedAt,
    };
    let order = if query.descending {
        Order::Desc
    } else {
        Order::Asc
    };

    select
        .order_by(column, order)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_product_by_name<C>(db: &C, name: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a product. Admin only.
///
/// # Errors
/// - [`Error::Validation`] if the name is empty
/// - [`Error::InvalidAmount`] if price or cost is negative or not finite
/// - [`Error::InvalidQuantity`] if stock is negative
/// - [`Error::Forbidden`] if the actor is not an admin
pub async fn create_product(
    db: &DatabaseConnection,
    actor_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    input.validate()?;
    require_admin(db, actor_id, "create product").await?;

    let product = product::ActiveModel {
        name: Set(input.name.trim().to_string()),
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
    .insert(db)
    .await?;

    tracing::info!(product_id = product.id, "Created product '{}'", product.name);
    Ok(product)
}

/// Replaces the editable fields of a product. Admin only.
pub async fn update_product(
    db: &DatabaseConnection,
    actor_id: i64,
    product_id: i64,
    input: ProductInput,
) -> Result<product::Model> {
    input.validate()?;
    require_admin(db, actor_id, "update product").await?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?
        .into();

    product.name = Set(input.name.trim().to_string());
    product.description = Set(input.description);
    product.price = Set(input.price);
    product.cost = Set(input.cost);
    product.category_id = Set(input.category_id);
    product.stock = Set(input.stock);
    product.featured = Set(input.featured);

    product.update(db).await.map_err(Into::into)
}

/// Deletes a product. Admin only. Cart lines holding it are removed with it;
/// products that already appear on orders cannot be deleted.
pub async fn delete_product(db: &DatabaseConnection, actor_id: i64, product_id: i64) -> Result<()> {
    require_admin(db, actor_id, "delete product").await?;

    let result = Product::delete_by_id(product_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Product", product_id));
    }
    tracing::info!(product_id, "Deleted product");
    Ok(())
}

/// Uploads an image to the bucket and stores its public URL on the product. Admin only.
pub async fn attach_image(
    db: &DatabaseConnection,
    bucket: &ImageBucket,
    actor_id: i64,
    product_id: i64,
    file_name: &str,
    bytes: &[u8],
) -> Result<product::Model> {
    require_admin(db, actor_id, "upload product image").await?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?
        .into();

    let StoredImage { public_url, .. } = bucket.upload(file_name, bytes).await?;
    product.image_url = Set(Some(public_url));
    product.update(db).await.map_err(Into::into)
}
