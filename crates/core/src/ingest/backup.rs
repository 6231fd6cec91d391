use crate::domain::records::{InventoryData, SaleOrigin, SaleRecord, StockRecord};
use anyhow::{ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const BACKUP_VERSION: &str = "1.0";

/// Full export of uploaded data. Restoring one replaces everything currently stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: InventoryData,
}

impl Backup {
    pub fn new(data: InventoryData, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            exported_at,
            data,
        }
    }

    pub fn file_name(&self) -> String {
        format!("stockwatch-backup-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}

pub fn export_backup(backup: &Backup) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(backup).context("serialize backup failed")
}

/// Reads either a native backup or one exported by the earlier browser tool
/// (`stockActual` / `ventasDiarias` / `ventasHistoricas`). Codes are trimmed the same way the
/// sheet importer trims them.
pub fn import_backup(bytes: &[u8]) -> anyhow::Result<Backup> {
    let value: serde_json::Value = serde_json::from_slice(bytes).context("invalid backup file")?;

    let mut backup = if value.get("stockActual").is_some() {
        let legacy: LegacyBackup =
            serde_json::from_value(value).context("invalid legacy backup file")?;
        legacy.into_backup()
    } else {
        let backup: Backup = serde_json::from_value(value).context("invalid backup file")?;
        let major = backup.version.split('.').next().unwrap_or("");
        ensure!(
            major == "1",
            "unsupported backup version {:?} (expected {BACKUP_VERSION})",
            backup.version
        );
        backup
    };

    for record in &mut backup.data.stock {
        trim_code(&mut record.code);
    }
    for record in &mut backup.data.sales {
        trim_code(&mut record.code);
    }

    tracing::info!(
        version = %backup.version,
        exported_at = %backup.exported_at,
        stock_len = backup.data.stock.len(),
        sales_len = backup.data.sales.len(),
        "read backup"
    );

    Ok(backup)
}

fn trim_code(code: &mut String) {
    let trimmed = code.trim();
    if trimmed.len() != code.len() {
        *code = trimmed.to_string();
    }
}

/// Only `stockActual` is required; the sales collections default to empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBackup {
    stock_actual: Vec<LegacyRecord>,
    #[serde(default)]
    ventas_diarias: Vec<LegacyRecord>,
    #[serde(default)]
    ventas_historicas: Vec<LegacyRecord>,
    #[serde(default)]
    ultima_fecha_stock: Option<NaiveDate>,
    #[serde(default)]
    fecha_exportacion: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    codigo: String,
    #[serde(default)]
    descripcion: String,
    cantidad: f64,
    fecha: NaiveDate,
}

impl LegacyRecord {
    fn into_sale(self, origin: SaleOrigin) -> SaleRecord {
        SaleRecord {
            code: self.codigo,
            description: self.descripcion,
            quantity: self.cantidad,
            date: self.fecha,
            origin,
        }
    }
}

impl LegacyBackup {
    fn into_backup(self) -> Backup {
        let stock = self
            .stock_actual
            .into_iter()
            .map(|r| StockRecord {
                code: r.codigo,
                description: r.descripcion,
                // Stock sheets carry whole units.
                quantity: r.cantidad.trunc() as i64,
                as_of_date: r.fecha,
            })
            .collect();

        let sales = self
            .ventas_diarias
            .into_iter()
            .map(|r| r.into_sale(SaleOrigin::Daily))
            .chain(
                self.ventas_historicas
                    .into_iter()
                    .map(|r| r.into_sale(SaleOrigin::Historical)),
            )
            .collect();

        let data = InventoryData {
            stock,
            stock_as_of: self.ultima_fecha_stock,
            sales,
        };
        Backup::new(data, self.fecha_exportacion.unwrap_or_else(Utc::now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{SaleOrigin, SaleRecord, StockRecord};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    #[test]
    fn export_then_import_preserves_data() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        let mut data = InventoryData::default();
        data.replace_stock(
            vec![StockRecord {
                code: "A".to_string(),
                description: "Tire A".to_string(),
                quantity: 4,
                as_of_date: date,
            }],
            date,
        );
        data.append_sales(vec![SaleRecord {
            code: "A".to_string(),
            description: "Tire A".to_string(),
            quantity: 0.5,
            date,
            origin: SaleOrigin::Historical,
        }]);

        let exported_at = Utc.with_ymd_and_hms(2026, 4, 2, 18, 0, 0).unwrap();
        let backup = Backup::new(data, exported_at);
        let bytes = export_backup(&backup).unwrap();

        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["version"], "1.0");
        assert_eq!(v["stock"][0]["code"], "A");
        assert_eq!(v["sales"][0]["origin"], "historical");

        assert_eq!(import_backup(&bytes).unwrap(), backup);
        assert_eq!(backup.file_name(), "stockwatch-backup-2026-04-02.json");
    }

    #[test]
    fn rejects_backup_missing_collections() {
        let bytes = json!({
            "version": "1.0",
            "exported_at": "2026-04-02T18:00:00Z",
            "stock": [],
        })
        .to_string();
        assert!(import_backup(bytes.as_bytes()).is_err());
    }

    #[test]
    fn rejects_unknown_major_version() {
        let bytes = json!({
            "version": "2.0",
            "exported_at": "2026-04-02T18:00:00Z",
            "stock": [],
            "sales": [],
        })
        .to_string();
        assert!(import_backup(bytes.as_bytes()).is_err());
    }

    #[test]
    fn accepts_backup_without_snapshot_date() {
        let bytes = json!({
            "version": "1.0",
            "exported_at": "2026-04-02T18:00:00Z",
            "stock": [],
            "sales": [],
        })
        .to_string();
        let backup = import_backup(bytes.as_bytes()).unwrap();
        assert!(backup.data.is_empty());
        assert_eq!(backup.data.stock_as_of, None);
    }

    #[test]
    fn reads_legacy_browser_backup() {
        let bytes = json!({
            "stockActual": [
                {"codigo": " A1 ", "descripcion": "Tire A", "cantidad": 12, "fecha": "2026-04-01", "tipo": "stock"}
            ],
            "ventasDiarias": [
                {"codigo": "A1", "descripcion": "Tire A", "cantidad": 3, "fecha": "2026-04-01", "tipo": "ventas"}
            ],
            "ventasHistoricas": [
                {"codigo": "B2", "descripcion": "Tire B", "cantidad": 0.25, "fecha": "2026-01-01", "tipo": "ventas-historicas"}
            ],
            "ultimaFechaStock": "2026-04-01",
            "fechaExportacion": "2026-04-02T18:00:00.000Z",
            "version": "2.0"
        })
        .to_string();

        let backup = import_backup(bytes.as_bytes()).unwrap();
        assert_eq!(backup.version, BACKUP_VERSION);
        assert_eq!(
            backup.exported_at,
            Utc.with_ymd_and_hms(2026, 4, 2, 18, 0, 0).unwrap()
        );
        assert_eq!(backup.data.stock_as_of, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(backup.data.stock[0].code, "A1");
        assert_eq!(backup.data.stock[0].quantity, 12);

        let sales: Vec<_> = backup
            .data
            .sales
            .iter()
            .map(|s| (s.code.as_str(), s.quantity, s.origin))
            .collect();
        assert_eq!(
            sales,
            vec![
                ("A1", 3.0, SaleOrigin::Daily),
                ("B2", 0.25, SaleOrigin::Historical),
            ]
        );
    }

    #[test]
    fn legacy_backup_only_needs_stock() {
        let bytes = json!({ "stockActual": [] }).to_string();
        let backup = import_backup(bytes.as_bytes()).unwrap();
        assert!(backup.data.is_empty());
        assert_eq!(backup.data.stock_as_of, None);
    }

    #[test]
    fn restored_codes_are_trimmed() {
        let bytes = json!({
            "version": "1.0",
            "exported_at": "2026-04-02T18:00:00Z",
            "stock": [{"code": "  A ", "description": "Tire A", "quantity": 1, "as_of_date": "2026-04-02"}],
            "sales": [{"code": "A\t", "description": "Tire A", "quantity": 1.0, "date": "2026-04-02", "origin": "daily"}],
        })
        .to_string();
        let backup = import_backup(bytes.as_bytes()).unwrap();
        assert_eq!(backup.data.stock[0].code, "A");
        assert_eq!(backup.data.sales[0].code, "A");
    }
}
