//! Remote side of the cart mirror.
//!
//! [`CartStore`] is the seam between [`CartManager`](crate::client::cart::CartManager)
//! and wherever cart rows actually live. A borrowed database connection
//! implements it directly over `core::cart` and `core::checkout`.

use crate::{
    core::{
        cart::{self, CartLine},
        checkout::{CheckoutParams, create_order_from_cart},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::future::Future;

/// Operations the cart mirror needs from the remote store
pub trait CartStore: Send + Sync {
    /// All rows of a user's cart, joined with their products, in insertion order
    fn fetch_cart(&self, user_id: i64) -> impl Future<Output = Result<Vec<CartLine>>> + Send;

    /// Inserts a row and returns it as stored
    fn insert_item(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> impl Future<Output = Result<CartLine>> + Send;

    /// Sets the quantity of one of the user's rows
    fn update_item(
        &self,
        user_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes one of the user's rows
    fn delete_item(&self, user_id: i64, item_id: i64) -> impl Future<Output = Result<()>> + Send;

    fn clear(&self, user_id: i64) -> impl Future<Output = Result<()>> + Send;

    /// Runs the atomic order procedure and returns the new order id
    fn create_order(&self, params: CheckoutParams) -> impl Future<Output = Result<i64>> + Send;
}

impl CartStore for &DatabaseConnection {
    async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartLine>> {
        cart::list_cart(*self, user_id).await
    }

    async fn insert_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartLine> {
        cart::insert_cart_item(self, user_id, product_id, quantity).await
    }

    async fn update_item(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<()> {
        cart::update_cart_item(self, user_id, item_id, quantity).await
    }

    async fn delete_item(&self, user_id: i64, item_id: i64) -> Result<()> {
        cart::delete_cart_item(self, user_id, item_id).await
    }

    async fn clear(&self, user_id: i64) -> Result<()> {
        cart::clear_cart(*self, user_id).await.map(|_| ())
    }

    async fn create_order(&self, params: CheckoutParams) -> Result<i64> {
        create_order_from_cart(self, &params).await
    }
}
