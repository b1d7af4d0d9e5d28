//! Cart state manager.
//!
//! [`CartManager`] keeps an in-memory mirror of one user's cart rows and keeps
//! it in step with a [`CartStore`]. Every mutation follows the same contract:
//!
//! 1. validate locally (quantity, cached stock); a rejection leaves the mirror
//!    untouched and issues no remote call
//! 2. snapshot the mirror and apply the change to it immediately
//! 3. issue the remote call
//! 4. on failure restore the snapshot exactly and return the remote error
//!
//! New lines are shown right away under an [`ItemId::Temporary`] id and
//! replaced by the stored row once the insert returns. Failed calls are never
//! retried.

use crate::{
    client::{auth::AuthSnapshot, store::CartStore},
    core::{cart::CartLine, checkout::CheckoutParams},
    entities::{OrderStatus, OrderType, PaymentMethod, product},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Identity of a line in the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemId {
    /// Placeholder shown while the insert is in flight
    Temporary(u64),
    /// Id of the stored cart row
    Stored(i64),
}

impl ItemId {
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(n) => write!(f, "temp-{n}"),
            Self::Stored(id) => write!(f, "{id}"),
        }
    }
}

/// One line of the mirrored cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub product_id: i64,
    pub quantity: i32,
    /// Product as last seen; its `stock` is the cached bound for `quantity`
    pub product: Option<product::Model>,
}

impl CartItem {
    fn name(&self) -> String {
        self.product
            .as_ref()
            .map_or_else(|| format!("product #{}", self.product_id), |p| p.name.clone())
    }

    fn cached_stock(&self) -> Option<i32> {
        self.product.as_ref().map(|p| p.stock)
    }

    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.product
            .as_ref()
            .map_or(0.0, |p| p.price * f64::from(self.quantity))
    }
}

impl From<CartLine> for CartItem {
    fn from(line: CartLine) -> Self {
        Self {
            id: ItemId::Stored(line.id),
            product_id: line.product_id,
            quantity: line.quantity,
            product: line.product,
        }
    }
}

/// Checkout options chosen at the counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub contact_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub order_type: OrderType,
    pub payment_method: Option<PaymentMethod>,
    pub status: OrderStatus,
    pub shipping_cost: f64,
}

impl Default for CheckoutRequest {
    fn default() -> Self {
        Self {
            contact_id: None,
            assigned_to: None,
            order_type: OrderType::Sale,
            payment_method: None,
            status: OrderStatus::Pending,
            shipping_cost: 0.0,
        }
    }
}

pub struct CartManager<S> {
    store: S,
    user_id: i64,
    items: Vec<CartItem>,
    next_temporary: u64,
    state: watch::Sender<Vec<CartItem>>,
}

impl<S: CartStore> CartManager<S> {
    /// Loads the user's cart from the store.
    pub async fn load(store: S, user_id: i64) -> Result<Self> {
        let items: Vec<CartItem> = store
            .fetch_cart(user_id)
            .await?
            .into_iter()
            .map(CartItem::from)
            .collect();
        let (state, _) = watch::channel(items.clone());
        tracing::debug!(user_id, lines = items.len(), "Cart loaded");
        Ok(Self {
            store,
            user_id,
            items,
            next_temporary: 0,
            state,
        })
    }

    /// Loads the cart of the signed-in user.
    ///
    /// # Errors
    /// [`Error::NotAuthenticated`] when the snapshot has no session.
    pub async fn for_session(store: S, auth: &AuthSnapshot) -> Result<Self> {
        let user_id = auth.user_id().ok_or(Error::NotAuthenticated)?;
        Self::load(store, user_id).await
    }

    /// Replaces the mirror with the store's current rows.
    pub async fn refresh(&mut self) -> Result<()> {
        let items = self
            .store
            .fetch_cart(self.user_id)
            .await?
            .into_iter()
            .map(CartItem::from)
            .collect();
        self.items = items;
        self.publish();
        Ok(())
    }

    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Number of units in the cart.
    #[must_use]
    pub fn count(&self) -> i32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Receiver of the item list, published after every change including
    /// optimistic placeholders and rollbacks.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartItem>> {
        self.state.subscribe()
    }

    fn publish(&self) {
        self.state.send_replace(self.items.clone());
    }

    fn position(&self, item_id: ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| Error::not_found("Cart item", item_id))
    }

    fn rollback(&mut self, snapshot: Vec<CartItem>, error: &Error) {
        tracing::warn!(user_id = self.user_id, "Cart change failed, rolling back: {error}");
        self.items = snapshot;
        self.publish();
    }

    fn reject_over_stock(item_name: String, requested: i32, stock: i32) -> Error {
        tracing::warn!(requested, stock, "Cannot add more of '{item_name}' than available stock");
        Error::InsufficientStock {
            products: vec![item_name],
        }
    }

    /// Adds `quantity` units of `product`.
    ///
    /// An existing line for the product has its quantity increased; otherwise a
    /// placeholder line is shown until the stored row comes back.
    ///
    /// # Errors
    /// - [`Error::InvalidQuantity`] if `quantity` is not positive
    /// - [`Error::InsufficientStock`] if the resulting quantity exceeds the cached stock
    /// - the store's error if the remote write fails, after rolling back
    pub async fn add_to_cart(&mut self, product: &product::Model, quantity: i32) -> Result<()> {
        if quantity <= 0 {
            return Err(Error::InvalidQuantity { quantity });
        }

        match self.items.iter().position(|item| item.product_id == product.id) {
            Some(index) => {
                let existing = &self.items[index];
                let stock = existing.cached_stock().unwrap_or(product.stock);
                let new_quantity = match existing.quantity.checked_add(quantity) {
                    Some(n) if n <= stock => n,
                    Some(n) => return Err(Self::reject_over_stock(existing.name(), n, stock)),
                    None => return Err(Self::reject_over_stock(existing.name(), i32::MAX, stock)),
                };
                let ItemId::Stored(row_id) = existing.id else {
                    return Err(Error::validation(format!(
                        "'{}' is still being added to the cart",
                        existing.name()
                    )));
                };

                let snapshot = self.items.clone();
                self.items[index].quantity = new_quantity;
                self.publish();

                if let Err(e) = self.store.update_item(self.user_id, row_id, new_quantity).await {
                    self.rollback(snapshot, &e);
                    return Err(e);
                }
                Ok(())
            }
            None => {
                if quantity > product.stock {
                    return Err(Self::reject_over_stock(
                        product.name.clone(),
                        quantity,
                        product.stock,
                    ));
                }

                let snapshot = self.items.clone();
                let placeholder = ItemId::Temporary(self.next_temporary);
                self.next_temporary += 1;
                self.items.push(CartItem {
                    id: placeholder,
                    product_id: product.id,
                    quantity,
                    product: Some(product.clone()),
                });
                self.publish();

                match self
                    .store
                    .insert_item(self.user_id, product.id, quantity)
                    .await
                {
                    Ok(line) => {
                        let stored = CartItem::from(line);
                        tracing::debug!(placeholder = %placeholder, stored = %stored.id, "Cart line saved");
                        if let Some(item) = self.items.iter_mut().find(|item| item.id == placeholder) {
                            *item = stored;
                        }
                        self.publish();
                        Ok(())
                    }
                    Err(e) => {
                        self.rollback(snapshot, &e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Sets the quantity of a line; zero or less removes it.
    pub async fn update_quantity(&mut self, item_id: ItemId, quantity: i32) -> Result<()> {
        if quantity <= 0 {
            return self.remove_from_cart(item_id).await;
        }

        let index = self.position(item_id)?;
        let item = &self.items[index];
        if let Some(stock) = item.cached_stock().filter(|stock| quantity > *stock) {
            return Err(Self::reject_over_stock(item.name(), quantity, stock));
        }
        let ItemId::Stored(row_id) = item.id else {
            return Err(Error::not_found("Cart item", item_id));
        };

        let snapshot = self.items.clone();
        self.items[index].quantity = quantity;
        self.publish();

        if let Err(e) = self.store.update_item(self.user_id, row_id, quantity).await {
            self.rollback(snapshot, &e);
            return Err(e);
        }
        Ok(())
    }

    pub async fn remove_from_cart(&mut self, item_id: ItemId) -> Result<()> {
        let index = self.position(item_id)?;
        let ItemId::Stored(row_id) = self.items[index].id else {
            return Err(Error::not_found("Cart item", item_id));
        };

        let snapshot = self.items.clone();
        self.items.remove(index);
        self.publish();

        if let Err(e) = self.store.delete_item(self.user_id, row_id).await {
            self.rollback(snapshot, &e);
            return Err(e);
        }
        Ok(())
    }

    /// Empties the cart, here and in the store.
    pub async fn clear_cart(&mut self) -> Result<()> {
        let snapshot = std::mem::take(&mut self.items);
        self.publish();

        if let Err(e) = self.store.clear(self.user_id).await {
            self.rollback(snapshot, &e);
            return Err(e);
        }
        Ok(())
    }

    /// Converts the cart into an order and returns the order id.
    ///
    /// The store clears the stored cart as part of the order procedure; the
    /// mirror is emptied once it succeeds and left as it was otherwise.
    ///
    /// # Errors
    /// - [`Error::EmptyCart`] if there are no lines
    /// - [`Error::InsufficientStock`] naming every line over its cached stock
    /// - the store's error if the order procedure fails
    pub async fn finalize_sale(&mut self, request: CheckoutRequest) -> Result<i64> {
        if self.items.is_empty() {
            return Err(Error::EmptyCart);
        }

        let short: Vec<String> = self
            .items
            .iter()
            .filter(|item| item.cached_stock().is_some_and(|stock| stock < item.quantity))
            .map(CartItem::name)
            .collect();
        if !short.is_empty() {
            tracing::warn!(user_id = self.user_id, "Sale rejected, insufficient stock: {short:?}");
            return Err(Error::InsufficientStock { products: short });
        }

        let params = CheckoutParams {
            user_id: self.user_id,
            contact_id: request.contact_id,
            assigned_to: request.assigned_to,
            order_type: request.order_type,
            payment_method: request.payment_method,
            status: request.status,
            shipping_cost: request.shipping_cost,
        };
        let order_id = self.store.create_order(params).await?;

        self.items.clear();
        self.publish();
        tracing::info!(user_id = self.user_id, order_id, "Sale finalized");
        Ok(order_id)
    }
}
