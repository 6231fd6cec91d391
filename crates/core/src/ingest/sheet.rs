use crate::domain::records::{SaleOrigin, SaleRecord, StockRecord};
use crate::numeric::parse_int_prefix;
use anyhow::Context;
use chrono::NaiveDate;
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Options for reading the text export of an uploaded sheet.
#[derive(Debug, Clone, Copy)]
pub struct SheetOptions {
    /// Used when the bytes are not valid UTF-8. Office suites export delimited text in the
    /// system code page, which for this business is Windows-1252.
    pub fallback_encoding: &'static Encoding,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            fallback_encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

impl SheetOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SHEET_ENCODING") {
            match Encoding::for_label(s.trim().as_bytes()) {
                Some(enc) => out.fallback_encoding = enc,
                None => tracing::warn!(label = %s, "unknown SHEET_ENCODING; keeping default"),
            }
        }

        out
    }
}

/// One data row of an upload: `CODE | DESCRIPTION | QUANTITY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub code: String,
    pub description: String,
    pub quantity: i64,
}

pub fn decode_sheet<'a>(bytes: &'a [u8], opts: &SheetOptions) -> Cow<'a, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Err(_) => {
            let (text, had_errors) = opts.fallback_encoding.decode_without_bom_handling(bytes);
            if had_errors {
                tracing::warn!(
                    encoding = opts.fallback_encoding.name(),
                    "sheet contains bytes invalid in fallback encoding"
                );
            }
            text
        }
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (header.bytes().filter(|b| *b == d).count(), d))
        .filter(|(n, _)| *n > 0)
        .max_by_key(|(n, _)| *n)
        .map(|(_, d)| d)
        .unwrap_or(b',')
}

/// Reads data rows (the header row is skipped). Rows with an empty code or a quantity that is
/// not a positive integer are dropped; an unreadable quantity counts as 0.
pub fn parse_sheet_rows(bytes: &[u8], opts: &SheetOptions) -> anyhow::Result<Vec<SheetRow>> {
    let text = decode_sheet(bytes, opts);
    let delimiter = detect_delimiter(&text);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    let mut dropped: usize = 0;
    for (idx, record) in rdr.records().enumerate() {
        // +2: one for the header, one for 1-based numbering.
        let record = record.with_context(|| format!("malformed sheet row {}", idx + 2))?;

        let code = record.get(0).unwrap_or("").trim().to_string();
        let description = record.get(1).unwrap_or("").trim().to_string();
        let quantity = record.get(2).and_then(parse_int_prefix).unwrap_or(0);

        if code.is_empty() || quantity <= 0 {
            dropped += 1;
            continue;
        }

        out.push(SheetRow {
            code,
            description,
            quantity,
        });
    }

    let delimiter = delimiter as char;
    tracing::debug!(rows = out.len(), dropped, %delimiter, "parsed sheet");
    Ok(out)
}

pub fn import_stock(
    bytes: &[u8],
    as_of_date: NaiveDate,
    opts: &SheetOptions,
) -> anyhow::Result<Vec<StockRecord>> {
    let rows = parse_sheet_rows(bytes, opts).context("stock sheet import failed")?;
    Ok(rows
        .into_iter()
        .map(|row| StockRecord {
            code: row.code,
            description: row.description,
            quantity: row.quantity,
            as_of_date,
        })
        .collect())
}

pub fn import_daily_sales(
    bytes: &[u8],
    date: NaiveDate,
    opts: &SheetOptions,
) -> anyhow::Result<Vec<SaleRecord>> {
    let rows = parse_sheet_rows(bytes, opts).context("sales sheet import failed")?;
    Ok(rows
        .into_iter()
        .map(|row| SaleRecord {
            code: row.code,
            description: row.description,
            quantity: row.quantity as f64,
            date,
            origin: SaleOrigin::Daily,
        })
        .collect())
}
