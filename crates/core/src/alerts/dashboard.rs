use crate::domain::alert::{Alert, Level};
use crate::domain::records::{InventoryData, SaleOrigin};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline counters shown above the alert table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub reference_date: NaiveDate,
    /// Units sold on the reference date, daily uploads only.
    pub total_sales_today: f64,
    pub total_stock: i64,
    /// CRITICAL plus OUT_OF_STOCK.
    pub critical_alerts: usize,
    pub low_alerts: usize,
    pub out_of_stock: usize,
    pub sales_records: usize,
    pub sku_count: usize,
}

impl DashboardStats {
    pub fn compute(data: &InventoryData, alerts: &[Alert], reference_date: NaiveDate) -> Self {
        let count = |pred: fn(Level) -> bool| alerts.iter().filter(|a| pred(a.level)).count();

        Self {
            reference_date,
            total_sales_today: data
                .sales
                .iter()
                .filter(|s| s.origin == SaleOrigin::Daily && s.date == reference_date)
                .map(|s| s.quantity)
                .sum(),
            total_stock: data.stock.iter().map(|s| s.quantity).sum(),
            critical_alerts: count(|l| matches!(l, Level::Critical | Level::OutOfStock)),
            low_alerts: count(|l| l == Level::Low),
            out_of_stock: count(|l| l == Level::OutOfStock),
            sales_records: data.sales.len(),
            sku_count: data.stock.len(),
        }
    }

    /// Number of SKUs that need attention (the alert tab badge).
    pub fn attention_count(&self) -> usize {
        self.critical_alerts + self.low_alerts
    }
}
