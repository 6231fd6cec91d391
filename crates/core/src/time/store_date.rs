use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Resolves the date alerts are computed for: an explicit `YYYY-MM-DD`, or today's calendar date
/// at the store's UTC offset.
pub fn resolve_reference_date(
    reference_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
    utc_offset_hours: i32,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = reference_date_arg.map(str::trim).filter(|s| !s.is_empty()) {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid reference date (expected YYYY-MM-DD): {s}"));
    }

    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .with_context(|| format!("invalid store UTC offset: {utc_offset_hours}h"))?;
    Ok(now_utc.with_timezone(&offset).date_naive())
}
