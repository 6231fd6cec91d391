use crate::domain::alert::{Alert, Level};
use crate::numeric::{parse_float_prefix, parse_int_prefix};
use serde::{Deserialize, Serialize};

/// Filter form exactly as submitted by the dashboard: every field is free text and may be
/// missing or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertFilterParams {
    pub level: Option<String>,
    pub days_of_stock_min: Option<String>,
    pub days_of_stock_max: Option<String>,
    pub sales_per_day_min: Option<String>,
    pub sales_per_day_max: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Only(Level),
    /// A level name nothing can match.
    Unknown(String),
}

impl LevelFilter {
    fn matches(&self, level: Level) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Only(wanted) => *wanted == level,
            LevelFilter::Unknown(_) => false,
        }
    }
}

/// Conjunction of optional predicates. `None` fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub level: LevelFilter,
    pub days_of_stock_min: Option<i64>,
    pub days_of_stock_max: Option<i64>,
    pub sales_per_day_min: Option<f64>,
    pub sales_per_day_max: Option<f64>,
    /// Lowercased needle.
    pub search: Option<String>,
}

impl AlertFilter {
    /// Never fails: empty or unparsable bounds become "no constraint".
    pub fn from_params(params: &AlertFilterParams) -> Self {
        let level = match params.level.as_deref().map(str::trim) {
            None | Some("") | Some("all") => LevelFilter::All,
            Some(s) => match s.parse::<Level>() {
                Ok(level) => LevelFilter::Only(level),
                Err(_) => LevelFilter::Unknown(s.to_string()),
            },
        };

        let search = params
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Self {
            level,
            days_of_stock_min: params.days_of_stock_min.as_deref().and_then(parse_int_prefix),
            days_of_stock_max: params.days_of_stock_max.as_deref().and_then(parse_int_prefix),
            sales_per_day_min: params.sales_per_day_min.as_deref().and_then(parse_float_prefix),
            sales_per_day_max: params.sales_per_day_max.as_deref().and_then(parse_float_prefix),
            search,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if !self.level.matches(alert.level) {
            return false;
        }

        if let Some(min) = self.days_of_stock_min {
            if alert.days_of_stock_remaining < min {
                return false;
            }
        }
        if let Some(max) = self.days_of_stock_max {
            if alert.days_of_stock_remaining > max {
                return false;
            }
        }

        // Bounds compare against the rounded average shown to the user, not the raw float.
        if let Some(min) = self.sales_per_day_min {
            if alert.average_daily_sales < min {
                return false;
            }
        }
        if let Some(max) = self.sales_per_day_max {
            if alert.average_daily_sales > max {
                return false;
            }
        }

        if let Some(needle) = &self.search {
            if !alert.code.to_lowercase().contains(needle)
                && !alert.description.to_lowercase().contains(needle)
            {
                return false;
            }
        }

        true
    }
}

/// Narrows `alerts` to the ones matching `filter`, preserving order.
pub fn apply_filters(alerts: &[Alert], filter: &AlertFilter) -> Vec<Alert> {
    alerts
        .iter()
        .filter(|alert| filter.matches(alert))
        .cloned()
        .collect()
}

/// What the presentation layer should show for a filtered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertView {
    /// No alerts at all: nothing has been loaded yet.
    NoData,
    /// Alerts exist but the filter excludes every one of them.
    NoMatches,
    Ok,
}

impl AlertView {
    pub fn classify(total: usize, matched: usize) -> Self {
        if total == 0 {
            AlertView::NoData
        } else if matched == 0 {
            AlertView::NoMatches
        } else {
            AlertView::Ok
        }
    }
}
