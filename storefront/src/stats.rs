use crate::error::StoreError;
use crate::model::mongo_model::Order;
use crate::storage::OrderStorage;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStatistics {
    pub total_delivered_orders: usize,
    pub total_revenue: f64,
    pub monthly_sales: Vec<ProductSales>,
}

/// Reduces delivered orders in one calendar month to per-product sales.
/// Recomputed on every request; nothing is persisted.
pub struct StatisticsAggregator {
    orders: Arc<dyn OrderStorage>,
}

impl StatisticsAggregator {
    pub fn new(orders: Arc<dyn OrderStorage>) -> Self {
        Self { orders }
    }

    pub async fn monthly_report(
        &self,
        month: u32,
        year: i32,
    ) -> Result<MonthlyStatistics, StoreError> {
        let (start, end) = month_range(month, year)?;
        let orders = self.orders.find_delivered_between(start, end).await?;
        debug!(
            "Aggregating {} delivered orders for {}-{}",
            orders.len(),
            year,
            month
        );
        Ok(summarize(&orders))
    }
}

/// Calendar-month boundaries: first millisecond through last millisecond.
pub fn month_range(month: u32, year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), StoreError> {
    if !(1..=12).contains(&month) {
        return Err(StoreError::validation("Month must be between 1 and 12"));
    }
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| StoreError::validation("Invalid month or year"))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| StoreError::validation("Invalid month or year"))?;

    Ok((start, next - Duration::milliseconds(1)))
}

/// Folds line items into per-product quantity and revenue, keyed by the
/// snapshotted product name, sorted descending by quantity.
pub fn summarize(orders: &[Order]) -> MonthlyStatistics {
    let mut by_product: HashMap<String, ProductSales> = HashMap::new();
    let mut total_revenue = 0.0;

    for order in orders {
        for item in &order.products {
            let entry = by_product
                .entry(item.name.clone())
                .or_insert_with(|| ProductSales {
                    name: item.name.clone(),
                    quantity: 0,
                    revenue: 0.0,
                });
            entry.quantity += item.quantity;
            entry.revenue += item.line_total();
            total_revenue += item.line_total();
        }
    }

    let mut monthly_sales: Vec<ProductSales> = by_product.into_values().collect();
    monthly_sales.sort_by(|a, b| b.quantity.cmp(&a.quantity));

    MonthlyStatistics {
        total_delivered_orders: orders.len(),
        total_revenue,
        monthly_sales,
    }
}
