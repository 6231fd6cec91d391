pub mod alert_runs;
pub mod lock;
pub mod memory;
pub mod postgres;

use crate::domain::records::{InventoryData, SaleRecord, StockRecord};
use anyhow::Context;
use chrono::NaiveDate;

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Where uploaded stock and sales live between requests.
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn load(&self) -> anyhow::Result<InventoryData>;

    /// Replaces the current stock snapshot. Returns the number of records written.
    async fn replace_stock(
        &self,
        records: &[StockRecord],
        as_of_date: NaiveDate,
    ) -> anyhow::Result<u64>;

    /// Appends sale records. Returns the number of records written.
    async fn append_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64>;

    /// Drops every historical sale and stores `records` in their place. Daily sales are kept.
    async fn replace_historical_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64>;

    /// Replaces everything with `data` (backup restore).
    async fn restore(&self, data: &InventoryData) -> anyhow::Result<()>;

    async fn clear(&self) -> anyhow::Result<()>;
}
