use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved `days_of_stock_remaining` value meaning "no sales data, unbounded".
/// Part of the public output contract; kept as a literal so serialized alerts stay stable.
pub const NO_SALES_DAYS: i64 = 999;

/// Below this many days of stock a SKU is critical.
pub const CRITICAL_DAYS: i64 = 15;
/// Below this many days of stock a SKU is low.
pub const LOW_DAYS: i64 = 30;
/// Above this many days of stock a SKU is overstocked.
pub const OVERSTOCK_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    OutOfStock,
    Critical,
    Low,
    Optimal,
    Overstock,
    NoMovement,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::OutOfStock,
        Level::Critical,
        Level::Low,
        Level::Optimal,
        Level::Overstock,
        Level::NoMovement,
    ];

    /// Sort priority: lower surfaces first.
    pub fn priority(self) -> u8 {
        match self {
            Level::OutOfStock => 0,
            Level::Critical => 1,
            Level::Low => 2,
            Level::Optimal => 3,
            Level::Overstock => 4,
            Level::NoMovement => 5,
        }
    }

    /// Classifies a SKU that has sales data in the window. First match wins.
    pub fn classify(current_stock: i64, days_of_stock_remaining: i64) -> Self {
        if current_stock == 0 {
            Level::OutOfStock
        } else if days_of_stock_remaining < CRITICAL_DAYS {
            Level::Critical
        } else if days_of_stock_remaining < LOW_DAYS {
            Level::Low
        } else if days_of_stock_remaining > OVERSTOCK_DAYS {
            Level::Overstock
        } else {
            Level::Optimal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::OutOfStock => "OUT_OF_STOCK",
            Level::Critical => "CRITICAL",
            Level::Low => "LOW",
            Level::Optimal => "OPTIMAL",
            Level::Overstock => "OVERSTOCK",
            Level::NoMovement => "NO_MOVEMENT",
        }
    }

    /// Label used on the store floor and by the existing dashboard.
    pub fn display_label(self) -> &'static str {
        match self {
            Level::OutOfStock => "SIN STOCK",
            Level::Critical => "CRÍTICO",
            Level::Low => "BAJO",
            Level::Optimal => "ÓPTIMO",
            Level::Overstock => "SOBREESTOCK",
            Level::NoMovement => "SIN MOVIMIENTO",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stock level: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for Level {
    type Err = UnknownLevel;

    /// Accepts the wire name (`CRITICAL`) or the display label (`CRÍTICO`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == s || level.display_label() == s)
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Per-SKU restock classification. Derived from stock and sales on every computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: String,
    pub description: String,
    pub current_stock: i64,
    /// [`NO_SALES_DAYS`] when the SKU has stock but no sales in the window.
    pub days_of_stock_remaining: i64,
    /// Rounded to 2 decimals.
    pub average_daily_sales: f64,
    pub level: Level,
    /// Unrounded average, used for ordering within a level.
    pub sort_key: f64,
}

/// One batch computation of the alert list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRun {
    pub reference_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub alerts: Vec<Alert>,
}

impl AlertRun {
    pub fn count_by_level(&self) -> Vec<(Level, usize)> {
        Level::ALL
            .into_iter()
            .map(|level| (level, self.alerts.iter().filter(|a| a.level == level).count()))
            .collect()
    }
}
