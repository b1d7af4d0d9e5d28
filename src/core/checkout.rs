//! Order creation - the atomic "create order from cart" procedure.
//!
//! This is the only place stock is decremented. Everything happens inside one
//! database transaction: if any step fails nothing is written, the cart stays
//! as it was and no stock moves.

use crate::{
    core::{
        cart::list_cart,
        profile::{get_profile, require_role},
    },
    entities::{
        Contact, OrderStatus, OrderType, PaymentMethod, Product, Role, order, order_item, product,
    },
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

/// Parameters of the order procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutParams {
    /// Owner of the cart being converted
    pub user_id: i64,
    pub contact_id: Option<i64>,
    /// Seller credited with the order; defaults to the caller unless the caller
    /// is an admin. Only an admin may name someone other than the caller.
    pub assigned_to: Option<i64>,
    pub order_type: OrderType,
    pub payment_method: Option<PaymentMethod>,
    /// Either `pending` (invoice, receivable) or `paid` (charged at the counter)
    pub status: OrderStatus,
    pub shipping_cost: f64,
}

impl CheckoutParams {
    fn validate(&self) -> Result<()> {
        if !self.shipping_cost.is_finite() || self.shipping_cost < 0.0 {
            return Err(Error::InvalidAmount {
                amount: self.shipping_cost,
            });
        }
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Paid) {
            return Err(Error::validation(format!(
                "new orders must be pending or paid, not {}",
                self.status
            )));
        }
        if self.order_type == OrderType::Invoice && self.contact_id.is_none() {
            return Err(Error::validation("an invoice requires a contact"));
        }
        Ok(())
    }
}

/// Converts the user's cart into an order and returns the new order id.
///
/// # Errors
/// - [`Error::InvalidAmount`] / [`Error::Validation`] for bad parameters
/// - [`Error::Forbidden`] if a non-admin credits the order to someone else
/// - [`Error::NotFound`] if the contact or the assignee does not exist
/// - [`Error::EmptyCart`] if the cart has no lines
/// - [`Error::InsufficientStock`] naming every product whose stock is too low
pub async fn create_order_from_cart(db: &DatabaseConnection, params: &CheckoutParams) -> Result<i64> {
    params.validate()?;

    let txn = db.begin().await?;

    let caller = require_role(
        &txn,
        params.user_id,
        &[Role::Admin, Role::Seller, Role::Courier],
        "create order",
    )
    .await?;

    let assigned_to = match params.assigned_to {
        Some(seller_id) if seller_id != params.user_id && !caller.role.is_admin() => {
            tracing::warn!(
                user_id = params.user_id,
                seller_id,
                "Rejected checkout crediting another seller"
            );
            return Err(Error::Forbidden {
                action: "assign seller".to_string(),
                role: caller.role,
            });
        }
        Some(seller_id) => {
            if get_profile(&txn, seller_id).await?.is_none() {
                return Err(Error::not_found("Profile", seller_id));
            }
            Some(seller_id)
        }
        None => (!caller.role.is_admin()).then_some(params.user_id),
    };

    if let Some(contact_id) = params.contact_id {
        if Contact::find_by_id(contact_id).one(&txn).await?.is_none() {
            return Err(Error::not_found("Contact", contact_id));
        }
    }

    let lines = list_cart(&txn, params.user_id).await?;
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    let short: Vec<String> = lines
        .iter()
        .filter_map(|line| match &line.product {
            Some(p) if p.stock >= line.quantity => None,
            Some(p) => Some(p.name.clone()),
            None => Some(format!("product #{}", line.product_id)),
        })
        .collect();
    if !short.is_empty() {
        tracing::warn!(user_id = params.user_id, "Checkout rejected, insufficient stock: {short:?}");
        return Err(Error::InsufficientStock { products: short });
    }

    let total: f64 = lines
        .iter()
        .filter_map(|line| line.product.as_ref().map(|p| p.price * f64::from(line.quantity)))
        .sum();

    let order = order::ActiveModel {
        user_id: Set(params.user_id),
        contact_id: Set(params.contact_id),
        total: Set(total),
        status: Set(params.status),
        order_type: Set(params.order_type),
        payment_method: Set(params.payment_method),
        shipping_cost: Set(params.shipping_cost),
        assigned_to: Set(assigned_to),
        courier_id: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for line in &lines {
        let Some(product) = &line.product else {
            continue;
        };

        order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(line.quantity),
            price: Set(product.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // The stock guard covers writers that changed stock after the read above
        let updated = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).sub(line.quantity),
            )
            .filter(product::Column::Id.eq(product.id))
            .filter(product::Column::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(Error::InsufficientStock {
                products: vec![product.name.clone()],
            });
        }
    }

    crate::core::cart::clear_cart(&txn, params.user_id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id = params.user_id,
        lines = lines.len(),
        total,
        "Created order from cart"
    );
    Ok(order.id)
}
