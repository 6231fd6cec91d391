use super::InventoryStore;
use crate::domain::records::{InventoryData, SaleRecord, StockRecord};
use chrono::NaiveDate;
use tokio::sync::RwLock;

/// Process-local store. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    data: RwLock<InventoryData>,
}

impl MemoryInventoryStore {
    pub fn new(data: InventoryData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

#[async_trait::async_trait]
impl InventoryStore for MemoryInventoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> anyhow::Result<InventoryData> {
        Ok(self.data.read().await.clone())
    }

    async fn replace_stock(
        &self,
        records: &[StockRecord],
        as_of_date: NaiveDate,
    ) -> anyhow::Result<u64> {
        self.data
            .write()
            .await
            .replace_stock(records.to_vec(), as_of_date);
        Ok(records.len() as u64)
    }

    async fn append_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64> {
        self.data.write().await.append_sales(records.to_vec());
        Ok(records.len() as u64)
    }

    async fn replace_historical_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64> {
        self.data
            .write()
            .await
            .replace_historical_sales(records.to_vec());
        Ok(records.len() as u64)
    }

    async fn restore(&self, data: &InventoryData) -> anyhow::Result<()> {
        *self.data.write().await = data.clone();
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.data.write().await.clear();
        Ok(())
    }
}
