use stockwatch_core::alerts::dashboard::DashboardStats;
use stockwatch_core::domain::alert::{AlertRun, Level};
use stockwatch_core::domain::records::InventoryData;

/// How many of the most urgent SKUs to name in the run log.
const URGENT_PREVIEW: usize = 10;

pub fn log_run(run: &AlertRun, data: &InventoryData) {
    let stats = DashboardStats::compute(data, &run.alerts, run.reference_date);

    tracing::info!(
        reference_date = %run.reference_date,
        alerts = run.alerts.len(),
        levels = %level_summary(run),
        total_stock = stats.total_stock,
        total_sales_today = stats.total_sales_today,
        attention = stats.attention_count(),
        "computed alert run"
    );

    let urgent = urgent_codes(run);
    if !urgent.is_empty() {
        tracing::warn!(
            reference_date = %run.reference_date,
            codes = %urgent.join(","),
            "SKUs out of stock or critical"
        );
    }
}

/// `OUT_OF_STOCK=1 CRITICAL=2 ...`, levels with no alerts omitted.
fn level_summary(run: &AlertRun) -> String {
    run.count_by_level()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(level, n)| format!("{level}={n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn urgent_codes(run: &AlertRun) -> Vec<&str> {
    run.alerts
        .iter()
        .filter(|a| matches!(a.level, Level::OutOfStock | Level::Critical))
        .take(URGENT_PREVIEW)
        .map(|a| a.code.as_str())
        .collect()
}
