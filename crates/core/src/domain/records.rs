use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Most recent known on-hand quantity for a SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub as_of_date: NaiveDate,
}

/// Units of a SKU sold on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub code: String,
    pub description: String,
    /// Fractional when produced by historical distribution.
    pub quantity: f64,
    pub date: NaiveDate,
    pub origin: SaleOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleOrigin {
    Daily,
    Historical,
}

impl SaleOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            SaleOrigin::Daily => "daily",
            SaleOrigin::Historical => "historical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(SaleOrigin::Daily),
            "historical" => Some(SaleOrigin::Historical),
            _ => None,
        }
    }
}

/// Everything the business has uploaded: the current stock snapshot plus every sale ever
/// recorded. Alerts are always derived from this, never stored alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryData {
    pub stock: Vec<StockRecord>,
    pub stock_as_of: Option<NaiveDate>,
    pub sales: Vec<SaleRecord>,
}

impl InventoryData {
    /// A stock upload replaces the whole snapshot. SKUs missing from the newer upload are no
    /// longer on hand.
    pub fn replace_stock(&mut self, records: Vec<StockRecord>, as_of_date: NaiveDate) {
        self.stock = records;
        self.stock_as_of = Some(as_of_date);
    }

    pub fn append_sales(&mut self, records: Vec<SaleRecord>) {
        self.sales.extend(records);
    }

    /// Historical sales are loaded once per dataset: a new historical upload drops the previous
    /// historical records and keeps every daily one.
    pub fn replace_historical_sales(&mut self, records: Vec<SaleRecord>) {
        self.sales.retain(|s| s.origin != SaleOrigin::Historical);
        self.sales.extend(records);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty() && self.sales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn stock(code: &str, quantity: i64, as_of_date: NaiveDate) -> StockRecord {
        StockRecord {
            code: code.to_string(),
            description: format!("Tire {code}"),
            quantity,
            as_of_date,
        }
    }

    #[test]
    fn stock_upload_replaces_previous_snapshot() {
        let mut data = InventoryData::default();
        data.replace_stock(vec![stock("A", 10, d(1)), stock("B", 4, d(1))], d(1));
        data.replace_stock(vec![stock("A", 7, d(2))], d(2));

        assert_eq!(data.stock.len(), 1);
        assert_eq!(data.stock[0].quantity, 7);
        assert_eq!(data.stock_as_of, Some(d(2)));
    }

    #[test]
    fn sales_uploads_accumulate_and_clear_resets() {
        let mut data = InventoryData::default();
        assert!(data.is_empty());

        let sale = SaleRecord {
            code: "A".to_string(),
            description: "Tire A".to_string(),
            quantity: 2.0,
            date: d(1),
            origin: SaleOrigin::Daily,
        };
        data.append_sales(vec![sale.clone()]);
        data.append_sales(vec![sale]);
        assert_eq!(data.sales.len(), 2);
        assert!(!data.is_empty());

        data.clear();
        assert!(data.is_empty());
        assert_eq!(data.stock_as_of, None);
    }

    #[test]
    fn historical_upload_replaces_only_historical_sales() {
        let sale = |quantity: f64, origin: SaleOrigin| SaleRecord {
            code: "A".to_string(),
            description: "Tire A".to_string(),
            quantity,
            date: d(1),
            origin,
        };

        let mut data = InventoryData::default();
        data.append_sales(vec![sale(2.0, SaleOrigin::Daily)]);
        data.replace_historical_sales(vec![sale(0.5, SaleOrigin::Historical)]);
        data.replace_historical_sales(vec![
            sale(1.5, SaleOrigin::Historical),
            sale(1.5, SaleOrigin::Historical),
        ]);

        let quantities: Vec<_> = data.sales.iter().map(|s| (s.origin, s.quantity)).collect();
        assert_eq!(
            quantities,
            vec![
                (SaleOrigin::Daily, 2.0),
                (SaleOrigin::Historical, 1.5),
                (SaleOrigin::Historical, 1.5),
            ]
        );
    }

    #[test]
    fn origin_round_trips_through_its_column_value() {
        for origin in [SaleOrigin::Daily, SaleOrigin::Historical] {
            assert_eq!(SaleOrigin::parse(origin.as_str()), Some(origin));
        }
        assert_eq!(SaleOrigin::parse("ventas"), None);
    }
}
