//! Sales reports, the daily closing report and the ledger balance.
//!
//! All functions return structured data; presentation is left to the caller.

use crate::{
    core::{
        ledger::{total_capital, total_expenses},
        order::{OrderFilter, list_order_lines, list_orders},
        period::DateRange,
    },
    entities::{OrderType, order},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of products listed in [`SalesReport::top_products`]
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Number of non-cancelled orders
    pub count: usize,
    /// Sum of order totals
    pub total: f64,
    /// Sum over invoice orders
    pub invoiced: f64,
    /// Sum over paid or delivered orders
    pub paid: f64,
}

impl DailyStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            count: 0,
            total: 0.0,
            invoiced: 0.0,
            paid: 0.0,
        }
    }

    fn add(&mut self, order: &order::Model) {
        self.count += 1;
        self.total += order.total;
        if order.order_type == OrderType::Invoice {
            self.invoiced += order.total;
        }
        if order.status.is_settled() {
            self.paid += order.total;
        }
    }

    /// Amount not yet collected.
    #[must_use]
    pub fn pending(&self) -> f64 {
        self.total - self.paid
    }

    /// Average order value, zero when there are no orders.
    #[must_use]
    pub fn average_ticket(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let count = self.count as f64;
            self.total / count
        }
    }
}

/// A best-selling product within a report range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Quantity times the price charged on each line
    pub revenue: f64,
}

/// Sales summary over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub total_sales: f64,
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub total_pending: f64,
    /// One entry per day with orders, newest first
    pub daily: Vec<DailyStats>,
    pub top_products: Vec<ProductStats>,
}

/// Money in versus money out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerBalance {
    pub capital: f64,
    pub expenses: f64,
    /// Paid or delivered order totals over all time
    pub paid_sales: f64,
}

impl LedgerBalance {
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.capital - self.expenses + self.paid_sales
    }
}

async fn live_orders(db: &DatabaseConnection, range: Option<DateRange>) -> Result<Vec<order::Model>> {
    Ok(list_orders(
        db,
        &OrderFilter {
            created: range,
            exclude_cancelled: true,
            ..OrderFilter::default()
        },
    )
    .await?
    .into_iter()
    .map(|entry| entry.order)
    .collect())
}

/// Builds the sales report for every non-cancelled order created in `range`.
///
/// # Arguments
/// * `db` - Database connection
/// * `range` - Inclusive range of days
pub async fn sales_report(db: &DatabaseConnection, range: DateRange) -> Result<SalesReport> {
    let orders = live_orders(db, Some(range)).await?;

    let mut days: BTreeMap<NaiveDate, DailyStats> = BTreeMap::new();
    for order in &orders {
        let date = order.created_at.date_naive();
        days.entry(date)
            .or_insert_with(|| DailyStats::empty(date))
            .add(order);
    }

    let total_sales: f64 = days.values().map(|d| d.total).sum();
    let total_invoiced = days.values().map(|d| d.invoiced).sum();
    let total_paid: f64 = days.values().map(|d| d.paid).sum();

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let top_products = top_products(db, &order_ids).await?;

    tracing::debug!(
        start = %range.start,
        end = %range.end,
        orders = orders.len(),
        "Sales report generated"
    );

    Ok(SalesReport {
        range,
        total_sales,
        total_invoiced,
        total_paid,
        total_pending: total_sales - total_paid,
        daily: days.into_values().rev().collect(),
        top_products,
    })
}

async fn top_products(db: &DatabaseConnection, order_ids: &[i64]) -> Result<Vec<ProductStats>> {
    let mut by_product: HashMap<i64, ProductStats> = HashMap::new();
    for line in list_order_lines(db, order_ids).await? {
        let stats = by_product
            .entry(line.item.product_id)
            .or_insert_with(|| ProductStats {
                product_id: line.item.product_id,
                name: line.product_name.clone(),
                quantity: 0,
                revenue: 0.0,
            });
        stats.quantity += i64::from(line.item.quantity);
        stats.revenue += line.subtotal();
    }

    let mut ranked: Vec<ProductStats> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(TOP_PRODUCTS_LIMIT);
    Ok(ranked)
}

/// The closing report for a single day.
pub async fn daily_close(db: &DatabaseConnection, day: NaiveDate) -> Result<DailyStats> {
    let orders = live_orders(db, Some(DateRange::day(day))).await?;
    let mut stats = DailyStats::empty(day);
    for order in &orders {
        stats.add(order);
    }
    Ok(stats)
}

pub async fn ledger_balance(db: &DatabaseConnection) -> Result<LedgerBalance> {
    let paid_sales = live_orders(db, None)
        .await?
        .iter()
        .filter(|o| o.status.is_settled())
        .map(|o| o.total)
        .sum();

    Ok(LedgerBalance {
        capital: total_capital(db).await?,
        expenses: total_expenses(db).await?,
        paid_sales,
    })
}
