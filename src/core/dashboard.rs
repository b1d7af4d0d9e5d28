//! Per-role dashboard summaries for sellers and couriers.

use crate::{
    config::settings::PricingConfig,
    core::{
        order::{OrderFilter, list_orders},
        period::DateRange,
    },
    entities::{Order, OrderStatus, order},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};

/// Seller performance over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub seller_id: i64,
    pub range: DateRange,
    pub order_count: usize,
    pub total_sales: f64,
    /// Sales that are paid or delivered
    pub commissionable_sales: f64,
    pub commission: f64,
    pub orders: Vec<order::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierSummary {
    pub courier_id: i64,
    pub day: NaiveDate,
    pub delivered: usize,
    pub pending: usize,
    pub suspended: usize,
    pub earnings: f64,
    /// Order total plus shipping over delivered orders
    pub cash_collected: f64,
    pub orders: Vec<order::Model>,
}

/// Monday to Sunday of the week containing `date`; the seller dashboard default.
#[must_use]
pub fn week_of(date: NaiveDate) -> DateRange {
    DateRange::week_of(date)
}

/// Summarizes the non-cancelled orders credited to a seller in `range`.
///
/// Commission is `pricing.seller_commission_rate` of the settled sales.
pub async fn seller_summary(
    db: &DatabaseConnection,
    seller_id: i64,
    range: DateRange,
    pricing: &PricingConfig,
) -> Result<SellerSummary> {
    let orders: Vec<order::Model> = list_orders(
        db,
        &OrderFilter {
            assigned_to: Some(seller_id),
            created: Some(range),
            exclude_cancelled: true,
            ..OrderFilter::default()
        },
    )
    .await?
    .into_iter()
    .map(|entry| entry.order)
    .collect();

    let total_sales = orders.iter().map(|o| o.total).sum();
    let commissionable_sales: f64 = orders
        .iter()
        .filter(|o| o.status.is_settled())
        .map(|o| o.total)
        .sum();

    Ok(SellerSummary {
        seller_id,
        range,
        order_count: orders.len(),
        total_sales,
        commissionable_sales,
        commission: commissionable_sales * pricing.seller_commission_rate,
        orders,
    })
}

/// Summarizes one day of a courier's deliveries, paying
/// `pricing.courier_delivery_fee` per delivered order.
pub async fn courier_summary(
    db: &DatabaseConnection,
    courier_id: i64,
    day: NaiveDate,
    pricing: &PricingConfig,
) -> Result<CourierSummary> {
    let (from, until) = DateRange::day(day).bounds();
    let orders = Order::find()
        .filter(order::Column::CourierId.eq(courier_id))
        .filter(order::Column::CreatedAt.gte(from))
        .filter(order::Column::CreatedAt.lt(until))
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await?;

    let delivered: Vec<&order::Model> = orders.iter().filter(|o| o.status.is_settled()).collect();
    let pending = orders.iter().filter(|o| o.status.is_in_transit()).count();
    let suspended = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Suspended)
        .count();
    let cash_collected = delivered.iter().map(|o| o.total + o.shipping_cost).sum();

    #[allow(clippy::cast_precision_loss)]
    let earnings = delivered.len() as f64 * pricing.courier_delivery_fee;

    Ok(CourierSummary {
        courier_id,
        day,
        delivered: delivered.len(),
        pending,
        suspended,
        earnings,
        cash_collected,
        orders,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::order::{assign_courier, cancel_order, charge_order, set_status},
        entities::Role,
        test_utils::*,
    };
    use chrono::Utc;

    #[test]
    fn test_week_of_starts_monday() {
        let thursday = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let week = week_of(thursday);
        assert_eq!(week.start, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(week.end, NaiveDate::from_ymd_opt(2024, 5, 19).unwrap());
    }

    #[tokio::test]
    async fn test_seller_summary_commission() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;

        let paid = create_test_invoice(&db, seller.id, "Maria").await?;
        create_test_invoice(&db, seller.id, "Juan").await?;
        let cancelled = create_test_invoice(&db, seller.id, "Luz").await?;
        charge_order(&db, admin.id, paid).await?;
        cancel_order(&db, admin.id, cancelled).await?;

        let today = Utc::now().date_naive();
        let pricing = PricingConfig::default();
        let summary = seller_summary(&db, seller.id, week_of(today), &pricing).await?;
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.total_sales, 20.0);
        assert_eq!(summary.commissionable_sales, 10.0);
        assert!((summary.commission - 2.0).abs() < 1e-9);

        let other = create_test_user(&db, "other@shop.test", Role::Seller).await?;
        let empty = seller_summary(&db, other.id, week_of(today), &pricing).await?;
        assert_eq!(empty.order_count, 0);
        assert_eq!(empty.commission, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_courier_summary_counts() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let courier = create_test_user(&db, "courier@shop.test", Role::Courier).await?;

        let mut ids = Vec::new();
        for name in ["Maria", "Juan", "Luz"] {
            let id = create_test_invoice(&db, seller.id, name).await?;
            assign_courier(&db, admin.id, id, Some(courier.id)).await?;
            ids.push(id);
        }
        set_status(&db, courier.id, ids[0], OrderStatus::Delivered).await?;
        set_status(&db, courier.id, ids[1], OrderStatus::Suspended).await?;

        let today = Utc::now().date_naive();
        let summary = courier_summary(&db, courier.id, today, &PricingConfig::default()).await?;
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.suspended, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.earnings, 250.0);
        assert_eq!(summary.cash_collected, 10.0);

        let pricing = PricingConfig {
            courier_delivery_fee: 300.0,
            ..PricingConfig::default()
        };
        let summary = courier_summary(&db, courier.id, today, &pricing).await?;
        assert_eq!(summary.earnings, 300.0);
        Ok(())
    }
}
