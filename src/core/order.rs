//! Order administration - listings, detail, assignment, charging and courier settlement.
//!
//! Who may do what:
//! - admins: everything, including seller/courier assignment and settlement
//! - sellers: charge or cancel orders
//! - couriers: mark their own orders `delivered` or `suspended`

use crate::{
    core::{
        period::DateRange,
        profile::{get_profile, require_admin, require_role},
    },
    entities::{
        Contact, Order, OrderItem, OrderStatus, Product, Role, contact, order, order_item,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Select, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

/// Statuses still owed by a courier at settlement time
pub const SETTLEMENT_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::Shipped,
    OrderStatus::Processing,
    OrderStatus::Delivered,
];

/// Criteria for [`list_orders`]; empty fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub assigned_to: Option<i64>,
    pub courier_id: Option<i64>,
    pub created: Option<DateRange>,
    /// Keep only these statuses (all when empty)
    pub statuses: Vec<OrderStatus>,
    pub exclude_cancelled: bool,
}

/// An order joined with its customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithContact {
    pub order: order::Model,
    pub contact: Option<contact::Model>,
}

/// An order line with the product fields needed for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: order_item::Model,
    pub product_name: String,
    pub image_url: Option<String>,
}

impl OrderLine {
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.item.price * f64::from(self.item.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: order::Model,
    pub contact: Option<contact::Model>,
    pub items: Vec<OrderLine>,
}

impl OrderDetail {
    /// Amount due including shipping.
    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.order.total + self.order.shipping_cost
    }
}

/// Courier settlement summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub courier_id: i64,
    pub orders: Vec<order::Model>,
    pub total: f64,
}

fn apply_filter(mut select: Select<Order>, filter: &OrderFilter) -> Select<Order> {
    if let Some(seller) = filter.assigned_to {
        select = select.filter(order::Column::AssignedTo.eq(seller));
    }
    if let Some(courier) = filter.courier_id {
        select = select.filter(order::Column::CourierId.eq(courier));
    }
    if let Some(range) = filter.created {
        let (from, until) = range.bounds();
        select = select
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lt(until));
    }
    if !filter.statuses.is_empty() {
        select = select.filter(order::Column::Status.is_in(filter.statuses.iter().copied()));
    }
    if filter.exclude_cancelled {
        select = select.filter(order::Column::Status.ne(OrderStatus::Cancelled));
    }
    select
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
}

/// Lists orders matching `filter`, newest first.
pub async fn list_orders(
    db: &DatabaseConnection,
    filter: &OrderFilter,
) -> Result<Vec<OrderWithContact>> {
    let rows = apply_filter(Order::find(), filter)
        .find_also_related(Contact)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(order, contact)| OrderWithContact { order, contact })
        .collect())
}

pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn load_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    get_order(db, order_id)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

/// Loads the lines of the given orders with product names.
pub async fn list_order_lines(db: &DatabaseConnection, order_ids: &[i64]) -> Result<Vec<OrderLine>> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
        .find_also_related(Product)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item, product)| OrderLine {
            product_name: product
                .as_ref()
                .map_or_else(|| "Unknown product".to_string(), |p| p.name.clone()),
            image_url: product.and_then(|p| p.image_url),
            item,
        })
        .collect())
}

/// Full invoice view of one order.
pub async fn get_order_detail(db: &DatabaseConnection, order_id: i64) -> Result<OrderDetail> {
    let (order, contact) = Order::find_by_id(order_id)
        .find_also_related(Contact)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    let items = list_order_lines(db, &[order.id]).await?;
    Ok(OrderDetail {
        order,
        contact,
        items,
    })
}

/// Case-insensitive match on order id, contact name or contact email.
#[must_use]
pub fn matches_search(entry: &OrderWithContact, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    entry.order.id.to_string().contains(&term)
        || entry
            .contact
            .as_ref()
            .is_some_and(|c| crate::core::contact::matches_search(c, &term))
}

async fn write_status(
    db: &DatabaseConnection,
    order: order::Model,
    status: OrderStatus,
) -> Result<order::Model> {
    let order_id = order.id;
    let previous = order.status;
    let mut active: order::ActiveModel = order.into();
    active.status = Set(status);
    let updated = active.update(db).await?;
    tracing::info!(order_id, from = %previous, to = %status, "Order status changed");
    Ok(updated)
}

/// Sets or clears the seller credited with an order. Admin only.
pub async fn assign_seller(
    db: &DatabaseConnection,
    actor_id: i64,
    order_id: i64,
    seller_id: Option<i64>,
) -> Result<order::Model> {
    require_admin(db, actor_id, "assign seller").await?;
    if let Some(seller_id) = seller_id {
        get_profile(db, seller_id)
            .await?
            .ok_or_else(|| Error::not_found("Profile", seller_id))?;
    }

    let mut active: order::ActiveModel = load_order(db, order_id).await?.into();
    active.assigned_to = Set(seller_id);
    active.update(db).await.map_err(Into::into)
}

/// Sets or clears the courier delivering an order. Admin only; the target must be a courier.
pub async fn assign_courier(
    db: &DatabaseConnection,
    actor_id: i64,
    order_id: i64,
    courier_id: Option<i64>,
) -> Result<order::Model> {
    require_admin(db, actor_id, "assign courier").await?;
    if let Some(courier_id) = courier_id {
        let profile = get_profile(db, courier_id)
            .await?
            .ok_or_else(|| Error::not_found("Profile", courier_id))?;
        if !profile.role.is_courier() {
            return Err(Error::validation(format!(
                "{} is a {}, not a courier",
                profile.email, profile.role
            )));
        }
    }

    let mut active: order::ActiveModel = load_order(db, order_id).await?.into();
    active.courier_id = Set(courier_id);
    active.update(db).await.map_err(Into::into)
}

/// Marks an order as paid (charged).
pub async fn charge_order(
    db: &DatabaseConnection,
    actor_id: i64,
    order_id: i64,
) -> Result<order::Model> {
    require_role(db, actor_id, &[Role::Admin, Role::Seller], "charge order").await?;
    let order = load_order(db, order_id).await?;
    if order.status == OrderStatus::Cancelled {
        return Err(Error::validation(format!(
            "order {order_id} is cancelled and cannot be charged"
        )));
    }
    write_status(db, order, OrderStatus::Paid).await
}

pub async fn cancel_order(
    db: &DatabaseConnection,
    actor_id: i64,
    order_id: i64,
) -> Result<order::Model> {
    require_role(db, actor_id, &[Role::Admin, Role::Seller], "cancel order").await?;
    let order = load_order(db, order_id).await?;
    write_status(db, order, OrderStatus::Cancelled).await
}

/// Changes an order's status.
///
/// Admins may set any status. Couriers may only set `delivered` or `suspended`,
/// and only on orders assigned to them.
pub async fn set_status(
    db: &DatabaseConnection,
    actor_id: i64,
    order_id: i64,
    status: OrderStatus,
) -> Result<order::Model> {
    let actor = require_role(db, actor_id, &[Role::Admin, Role::Courier], "change order status")
        .await?;
    let order = load_order(db, order_id).await?;

    if actor.role.is_courier() {
        if !matches!(status, OrderStatus::Delivered | OrderStatus::Suspended) {
            return Err(Error::Forbidden {
                action: format!("set status {status}"),
                role: actor.role,
            });
        }
        if order.courier_id != Some(actor_id) {
            return Err(Error::Forbidden {
                action: format!("update order {order_id} assigned to another courier"),
                role: actor.role,
            });
        }
    }

    write_status(db, order, status).await
}

/// Orders a courier still has to hand money in for.
pub async fn pending_settlement(db: &DatabaseConnection, courier_id: i64) -> Result<Settlement> {
    let orders = Order::find()
        .filter(order::Column::CourierId.eq(courier_id))
        .filter(order::Column::Status.is_in(SETTLEMENT_STATUSES))
        .order_by_asc(order::Column::CreatedAt)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await?;
    let total = orders.iter().map(|o| o.total).sum();
    Ok(Settlement {
        courier_id,
        orders,
        total,
    })
}

/// Marks every order in a courier's pending settlement as paid. Admin only.
/// Returns the number of orders settled.
pub async fn settle_courier(db: &DatabaseConnection, actor_id: i64, courier_id: i64) -> Result<u64> {
    require_admin(db, actor_id, "settle courier").await?;

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(OrderStatus::Paid))
        .filter(order::Column::CourierId.eq(courier_id))
        .filter(order::Column::Status.is_in(SETTLEMENT_STATUSES))
        .exec(db)
        .await?;

    tracing::info!(courier_id, settled = result.rows_affected, "Courier settled");
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_assignment_is_admin_only() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let courier = create_test_user(&db, "courier@shop.test", Role::Courier).await?;
        let order_id = create_test_order(&db, seller.id, &[("Soda", 10.0, 2)]).await?;

        let denied = assign_courier(&db, seller.id, order_id, Some(courier.id)).await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));
        let denied = assign_seller(&db, seller.id, order_id, None).await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let order = assign_courier(&db, admin.id, order_id, Some(courier.id)).await?;
        assert_eq!(order.courier_id, Some(courier.id));

        let not_courier = assign_courier(&db, admin.id, order_id, Some(seller.id)).await;
        assert!(matches!(not_courier, Err(Error::Validation { .. })));

        let order = assign_seller(&db, admin.id, order_id, None).await?;
        assert_eq!(order.assigned_to, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_charge_and_cancel() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let courier = create_test_user(&db, "courier@shop.test", Role::Courier).await?;
        let order_id = create_test_invoice(&db, seller.id, "Maria").await?;

        let denied = charge_order(&db, courier.id, order_id).await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let charged = charge_order(&db, seller.id, order_id).await?;
        assert_eq!(charged.status, OrderStatus::Paid);

        let cancelled = cancel_order(&db, seller.id, order_id).await?;
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(matches!(
            charge_order(&db, seller.id, order_id).await,
            Err(Error::Validation { .. })
        ));

        assert!(matches!(
            charge_order(&db, seller.id, 9999).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_courier_status_rules() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let courier = create_test_user(&db, "courier@shop.test", Role::Courier).await?;
        let other = create_test_user(&db, "other@shop.test", Role::Courier).await?;
        let order_id = create_test_invoice(&db, seller.id, "Maria").await?;
        assign_courier(&db, admin.id, order_id, Some(courier.id)).await?;

        let not_theirs = set_status(&db, other.id, order_id, OrderStatus::Delivered).await;
        assert!(matches!(not_theirs, Err(Error::Forbidden { .. })));

        let wrong_status = set_status(&db, courier.id, order_id, OrderStatus::Paid).await;
        assert!(matches!(wrong_status, Err(Error::Forbidden { .. })));

        let seller_denied = set_status(&db, seller.id, order_id, OrderStatus::Shipped).await;
        assert!(matches!(seller_denied, Err(Error::Forbidden { .. })));

        let delivered = set_status(&db, courier.id, order_id, OrderStatus::Delivered).await?;
        assert_eq!(delivered.status, OrderStatus::Delivered);

        let admin_any = set_status(&db, admin.id, order_id, OrderStatus::Processing).await?;
        assert_eq!(admin_any.status, OrderStatus::Processing);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_filters_and_detail() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let ana = create_test_user(&db, "ana@shop.test", Role::Seller).await?;
        let bob = create_test_user(&db, "bob@shop.test", Role::Seller).await?;
        let first = create_test_order(&db, ana.id, &[("Soda", 10.0, 2), ("Chips", 25.0, 1)]).await?;
        let second = create_test_invoice(&db, bob.id, "Maria").await?;
        cancel_order(&db, admin.id, second).await?;

        let all = list_orders(&db, &OrderFilter::default()).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].order.id, second);

        let by_ana = list_orders(
            &db,
            &OrderFilter {
                assigned_to: Some(ana.id),
                ..OrderFilter::default()
            },
        )
        .await?;
        assert_eq!(by_ana.len(), 1);
        assert_eq!(by_ana[0].order.id, first);

        let live = list_orders(
            &db,
            &OrderFilter {
                exclude_cancelled: true,
                created: Some(DateRange::day(chrono::Utc::now().date_naive())),
                ..OrderFilter::default()
            },
        )
        .await?;
        assert_eq!(live.len(), 1);

        let invoices: Vec<_> = all
            .iter()
            .filter(|o| matches_search(o, "maria"))
            .collect();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].order.id, second);

        let detail = get_order_detail(&db, first).await?;
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].product_name, "Soda");
        assert_eq!(detail.items[0].subtotal(), 20.0);
        assert_eq!(detail.grand_total(), 45.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_courier_settlement() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let courier = create_test_user(&db, "courier@shop.test", Role::Courier).await?;

        let a = create_test_invoice(&db, seller.id, "Maria").await?;
        let b = create_test_invoice(&db, seller.id, "Juan").await?;
        let c = create_test_invoice(&db, seller.id, "Luz").await?;
        for id in [a, b, c] {
            assign_courier(&db, admin.id, id, Some(courier.id)).await?;
        }
        set_status(&db, courier.id, b, OrderStatus::Delivered).await?;
        set_status(&db, courier.id, c, OrderStatus::Suspended).await?;

        let pending = pending_settlement(&db, courier.id).await?;
        let ids: Vec<i64> = pending.orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(pending.total, 20.0);

        assert!(matches!(
            settle_courier(&db, seller.id, courier.id).await,
            Err(Error::Forbidden { .. })
        ));
        assert_eq!(settle_courier(&db, admin.id, courier.id).await?, 2);
        assert!(pending_settlement(&db, courier.id).await?.orders.is_empty());
        assert_eq!(
            get_order(&db, c).await?.unwrap().status,
            OrderStatus::Suspended
        );
        Ok(())
    }
}
