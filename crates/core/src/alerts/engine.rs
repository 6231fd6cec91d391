use crate::domain::alert::{Alert, Level, NO_SALES_DAYS};
use crate::domain::records::{InventoryData, SaleRecord, StockRecord};
use crate::numeric::round_cents;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_WINDOW_DAYS: i64 = 90;

/// Denominator used when turning windowed sales into a daily average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelocityBasis {
    /// Total over the number of distinct dates that had any sale.
    #[default]
    SaleDays,
    /// Total over the full window length. More conservative for slow movers.
    FullWindow,
}

#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// Trailing window length, inclusive of the reference date.
    pub window_days: i64,
    pub velocity_basis: VelocityBasis,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            velocity_basis: VelocityBasis::SaleDays,
        }
    }
}

impl AlertPolicy {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("ALERT_WINDOW_DAYS") {
            if let Ok(n) = s.parse::<i64>() {
                if n > 0 {
                    out.window_days = n;
                }
            }
        }

        if let Ok(s) = std::env::var("ALERT_VELOCITY_BASIS") {
            match s.trim() {
                "sale_days" => out.velocity_basis = VelocityBasis::SaleDays,
                "full_window" => out.velocity_basis = VelocityBasis::FullWindow,
                _ => {}
            }
        }

        out
    }

    fn window_start(&self, reference_date: NaiveDate) -> NaiveDate {
        reference_date - Duration::days(self.window_days)
    }
}

#[derive(Debug, Default)]
struct SalesAggregate {
    total_quantity: f64,
    days: HashSet<NaiveDate>,
    description: String,
}

/// Computes the alert list with the default 90-day, sale-days policy.
pub fn compute_alerts(
    stock: &[StockRecord],
    sales: &[SaleRecord],
    reference_date: NaiveDate,
) -> Vec<Alert> {
    compute_alerts_with(stock, sales, reference_date, &AlertPolicy::default())
}

/// Derives one alert per SKU from the stock snapshot and the sales in the trailing window,
/// sorted by level priority and then by descending velocity.
pub fn compute_alerts_with(
    stock: &[StockRecord],
    sales: &[SaleRecord],
    reference_date: NaiveDate,
    policy: &AlertPolicy,
) -> Vec<Alert> {
    let window_start = policy.window_start(reference_date);

    // Codes in first-appearance order: stock snapshot first, then sales.
    let mut codes: Vec<&str> = Vec::new();
    let mut stock_by_code: HashMap<&str, &StockRecord> = HashMap::new();
    for record in stock {
        if !stock_by_code.contains_key(record.code.as_str()) {
            stock_by_code.insert(&record.code, record);
            codes.push(&record.code);
        }
    }

    let mut aggregates: HashMap<&str, SalesAggregate> = HashMap::new();
    let mut windowed: usize = 0;
    for sale in sales.iter().filter(|s| s.date >= window_start) {
        windowed += 1;
        let agg = aggregates.entry(sale.code.as_str()).or_insert_with(|| {
            if !stock_by_code.contains_key(sale.code.as_str()) {
                codes.push(&sale.code);
            }
            SalesAggregate::default()
        });
        agg.total_quantity += sale.quantity;
        agg.days.insert(sale.date);
        agg.description.clone_from(&sale.description);
    }

    let mut alerts = Vec::with_capacity(codes.len());
    for code in codes {
        let stock_item = stock_by_code.get(code).copied();
        let agg = aggregates.get(code);
        let current_stock = stock_item.map(|s| s.quantity).unwrap_or(0);

        match agg {
            Some(agg) if !agg.days.is_empty() => {
                let denominator = match policy.velocity_basis {
                    VelocityBasis::SaleDays => agg.days.len() as f64,
                    VelocityBasis::FullWindow => policy.window_days as f64,
                };
                let average = agg.total_quantity / denominator;
                let days_of_stock_remaining = days_of_stock(current_stock, average);
                let description = stock_item
                    .map(|s| s.description.clone())
                    .unwrap_or_else(|| agg.description.clone());

                alerts.push(Alert {
                    code: code.to_string(),
                    description,
                    current_stock,
                    days_of_stock_remaining,
                    average_daily_sales: round_cents(average),
                    level: Level::classify(current_stock, days_of_stock_remaining),
                    sort_key: average,
                });
            }
            _ => {
                if let Some(item) = stock_item.filter(|s| s.quantity > 0) {
                    alerts.push(Alert {
                        code: code.to_string(),
                        description: item.description.clone(),
                        current_stock,
                        days_of_stock_remaining: NO_SALES_DAYS,
                        average_daily_sales: 0.0,
                        level: Level::NoMovement,
                        sort_key: 0.0,
                    });
                }
            }
        }
    }

    // `sort_by` is stable: equal (level, velocity) pairs keep their first-appearance order.
    alerts.sort_by(|a, b| {
        a.level.priority().cmp(&b.level.priority()).then_with(|| {
            b.sort_key
                .partial_cmp(&a.sort_key)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    tracing::debug!(
        %reference_date,
        %window_start,
        stock_len = stock.len(),
        sales_len = sales.len(),
        windowed_sales = windowed,
        alerts_len = alerts.len(),
        "computed stock alerts"
    );

    alerts
}

/// `floor(stock / average)`, 0 when nothing is on hand. A zero average (sales recorded with
/// zero quantity) has no finite horizon and reports [`NO_SALES_DAYS`].
fn days_of_stock(current_stock: i64, average: f64) -> i64 {
    if current_stock <= 0 {
        return 0;
    }
    let days = (current_stock as f64 / average).floor();
    if days.is_finite() {
        days as i64
    } else {
        NO_SALES_DAYS
    }
}

impl InventoryData {
    pub fn alerts(&self, reference_date: NaiveDate, policy: &AlertPolicy) -> Vec<Alert> {
        compute_alerts_with(&self.stock, &self.sales, reference_date, policy)
    }
}
