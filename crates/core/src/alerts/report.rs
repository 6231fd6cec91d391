use crate::domain::alert::Alert;
use crate::numeric::format_cents;
use anyhow::Context;

const HEADER: [&str; 6] = [
    "Code",
    "Description",
    "Current stock",
    "Days of stock",
    "Average daily sales",
    "Level",
];

/// Renders the alert table as CSV for download or the batch report file.
pub fn write_report_csv(alerts: &[Alert]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER).context("write report header failed")?;

    for alert in alerts {
        let current_stock = alert.current_stock.to_string();
        let days = alert.days_of_stock_remaining.to_string();
        let average = format_cents(alert.average_daily_sales);
        wtr.write_record([
            alert.code.as_str(),
            alert.description.as_str(),
            current_stock.as_str(),
            days.as_str(),
            average.as_str(),
            alert.level.as_str(),
        ])
        .with_context(|| format!("write report row failed (code={})", alert.code))?;
    }

    wtr.into_inner().context("flush report failed")
}

pub fn report_file_name(reference_date: chrono::NaiveDate) -> String {
    format!("stock_alerts_{reference_date}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::Level;

    #[test]
    fn writes_header_and_quoted_rows() {
        let alerts = vec![Alert {
            code: "A-1".to_string(),
            description: "Tire, 15\"".to_string(),
            current_stock: 100,
            days_of_stock_remaining: 10,
            average_daily_sales: 10.0,
            level: Level::Critical,
            sort_key: 10.0,
        }];

        let out = String::from_utf8(write_report_csv(&alerts).unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Code,Description,Current stock,Days of stock,Average daily sales,Level")
        );
        assert_eq!(
            lines.next(),
            Some("A-1,\"Tire, 15\"\"\",100,10,10.00,CRITICAL")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn names_file_after_reference_date() {
        let d = chrono::NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(report_file_name(d), "stock_alerts_2026-02-03.csv");
    }
}
