//! Cart rows - the remote side of a user's cart.
//!
//! These are plain row operations; stock limits are soft-checked by the client
//! cart manager and enforced for real by `core::checkout`.

use crate::{
    entities::{CartItem, Product, cart_item, product},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// A cart row joined with its product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub product: Option<product::Model>,
}

impl CartLine {
    fn from_row(row: cart_item::Model, product: Option<product::Model>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
            product,
        }
    }
}

/// Lists a user's cart in insertion order.
pub async fn list_cart<C>(db: &C, user_id: i64) -> Result<Vec<CartLine>>
where
    C: ConnectionTrait,
{
    let rows = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .find_also_related(Product)
        .order_by_asc(cart_item::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(row, product)| CartLine::from_row(row, product))
        .collect())
}

/// Inserts a cart row and returns it joined with its product.
pub async fn insert_cart_item(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<CartLine> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity { quantity });
    }
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let row = cart_item::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(CartLine::from_row(row, Some(product)))
}

/// Sets the quantity of one of `user_id`'s cart rows.
///
/// # Errors
/// [`Error::NotFound`] if the row does not exist or belongs to another user.
pub async fn update_cart_item(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity { quantity });
    }
    let mut row: cart_item::ActiveModel = CartItem::find_by_id(item_id)
        .filter(cart_item::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Cart item", item_id))?
        .into();
    row.quantity = Set(quantity);
    row.update(db).await?;
    Ok(())
}

pub async fn delete_cart_item(db: &DatabaseConnection, user_id: i64, item_id: i64) -> Result<()> {
    let result = CartItem::delete_many()
        .filter(cart_item::Column::Id.eq(item_id))
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Cart item", item_id));
    }
    Ok(())
}

/// Deletes every row of a user's cart, returning how many were removed.
pub async fn clear_cart<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
