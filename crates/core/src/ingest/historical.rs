use crate::domain::records::{SaleOrigin, SaleRecord};
use crate::ingest::sheet::{parse_sheet_rows, SheetOptions, SheetRow};
use anyhow::{ensure, Context};
use chrono::{Duration, Months, NaiveDate};

/// A historical upload never spreads one SKU over more than this many dates.
pub const MAX_DISTRIBUTED_DATES: i64 = 30;

/// Inclusive span of whole months covered by a historical upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    /// `from` and `to` are `YYYY-MM`. The range runs from the first day of `from` to the last
    /// day of `to`.
    pub fn parse(from: &str, to: &str) -> anyhow::Result<Self> {
        let start = parse_month(from)?;
        let to_start = parse_month(to)?;
        ensure!(
            to_start >= start,
            "historical range ends before it starts ({from} > {to})"
        );

        let end = to_start
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .with_context(|| format!("month out of range: {to}"))?;

        Ok(Self { start, end })
    }

    /// Number of calendar days in the range, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn parse_month(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("invalid month (expected YYYY-MM): {s}"))
}

/// Spreads each SKU's period total over up to 30 dates evenly spaced across the range.
/// Every generated record carries `total / days_in_range`, so the daily average over the
/// generated dates approximates the period's true daily rate.
pub fn distribute_historical(rows: &[SheetRow], range: &MonthRange) -> Vec<SaleRecord> {
    let days = range.days();
    let points = days.min(MAX_DISTRIBUTED_DATES);

    let dates: Vec<NaiveDate> = (0..points)
        .map(|i| range.start + Duration::days(i * days / MAX_DISTRIBUTED_DATES))
        .collect();

    let mut out = Vec::with_capacity(rows.len() * dates.len());
    for row in rows {
        let per_day = row.quantity as f64 / days as f64;
        for date in &dates {
            out.push(SaleRecord {
                code: row.code.clone(),
                description: row.description.clone(),
                quantity: per_day,
                date: *date,
                origin: SaleOrigin::Historical,
            });
        }
    }
    out
}

pub fn import_historical_sales(
    bytes: &[u8],
    from_month: &str,
    to_month: &str,
    opts: &SheetOptions,
) -> anyhow::Result<Vec<SaleRecord>> {
    let range = MonthRange::parse(from_month, to_month)?;
    let rows = parse_sheet_rows(bytes, opts).context("historical sheet import failed")?;
    let out = distribute_historical(&rows, &range);

    tracing::info!(
        skus = rows.len(),
        records = out.len(),
        range_days = range.days(),
        start = %range.start,
        end = %range.end,
        "distributed historical sales"
    );

    Ok(out)
}
