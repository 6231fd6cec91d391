use super::InventoryStore;
use crate::domain::records::{InventoryData, SaleOrigin, SaleRecord, StockRecord};
use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

const DEFAULT_INSERT_BATCH: usize = 500;

#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
    batch_size: usize,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> anyhow::Result<Self> {
        let batch_size: usize = std::env::var("STOCKWATCH_INSERT_BATCH")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_INSERT_BATCH);

        anyhow::ensure!(batch_size >= 1, "STOCKWATCH_INSERT_BATCH must be >= 1");

        Ok(Self { pool, batch_size })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        records: &[StockRecord],
    ) -> anyhow::Result<u64> {
        let mut affected: u64 = 0;
        for (batch_idx, chunk) in records.chunks(self.batch_size).enumerate() {
            let t0 = std::time::Instant::now();
            let mut qb = sqlx::QueryBuilder::<Postgres>::new(
                "INSERT INTO stock_snapshot (code, description, quantity, as_of_date) ",
            );
            qb.push_values(chunk, |mut b, record| {
                b.push_bind(record.code.as_str())
                    .push_bind(record.description.as_str())
                    .push_bind(record.quantity)
                    .push_bind(record.as_of_date);
            });

            let res = qb
                .build()
                .persistent(false)
                .execute(&mut **tx)
                .await
                .context("batch insert stock_snapshot failed")?;
            affected += res.rows_affected();

            tracing::debug!(
                batch_idx,
                batch_size = chunk.len(),
                elapsed_ms = t0.elapsed().as_millis(),
                "stock_snapshot batch insert"
            );
        }
        Ok(affected)
    }

    async fn insert_sales(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        records: &[SaleRecord],
    ) -> anyhow::Result<u64> {
        let mut affected: u64 = 0;
        for (batch_idx, chunk) in records.chunks(self.batch_size).enumerate() {
            let t0 = std::time::Instant::now();
            let mut qb = sqlx::QueryBuilder::<Postgres>::new(
                "INSERT INTO sale_records (code, description, quantity, sale_date, origin) ",
            );
            qb.push_values(chunk, |mut b, record| {
                b.push_bind(record.code.as_str())
                    .push_bind(record.description.as_str())
                    .push_bind(record.quantity)
                    .push_bind(record.date)
                    .push_bind(record.origin.as_str());
            });

            let res = qb
                .build()
                .persistent(false)
                .execute(&mut **tx)
                .await
                .context("batch insert sale_records failed")?;
            affected += res.rows_affected();

            tracing::debug!(
                batch_idx,
                batch_size = chunk.len(),
                elapsed_ms = t0.elapsed().as_millis(),
                "sale_records batch insert"
            );
        }
        Ok(affected)
    }
}

async fn set_stock_as_of(
    tx: &mut Transaction<'_, Postgres>,
    stock_as_of: Option<NaiveDate>,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO inventory_meta (singleton, stock_as_of) VALUES (TRUE, $1) \
         ON CONFLICT (singleton) DO UPDATE SET stock_as_of = EXCLUDED.stock_as_of",
    )
    .persistent(false)
    .bind(stock_as_of)
    .execute(&mut **tx)
    .await
    .context("upsert inventory_meta failed")?;
    Ok(())
}

async fn delete_all(tx: &mut Transaction<'_, Postgres>) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM stock_snapshot")
        .persistent(false)
        .execute(&mut **tx)
        .await
        .context("delete stock_snapshot failed")?;
    sqlx::query("DELETE FROM sale_records")
        .persistent(false)
        .execute(&mut **tx)
        .await
        .context("delete sale_records failed")?;
    Ok(())
}

#[async_trait::async_trait]
impl InventoryStore for PgInventoryStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self) -> anyhow::Result<InventoryData> {
        let stock = sqlx::query_as::<_, (String, String, i64, NaiveDate)>(
            "SELECT code, description, quantity, as_of_date FROM stock_snapshot ORDER BY id ASC",
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .context("select stock_snapshot failed")?
        .into_iter()
        .map(|(code, description, quantity, as_of_date)| StockRecord {
            code,
            description,
            quantity,
            as_of_date,
        })
        .collect();

        let rows = sqlx::query_as::<_, (String, String, f64, NaiveDate, String)>(
            "SELECT code, description, quantity, sale_date, origin FROM sale_records ORDER BY id ASC",
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .context("select sale_records failed")?;

        let mut sales = Vec::with_capacity(rows.len());
        for (code, description, quantity, date, origin) in rows {
            let origin = SaleOrigin::parse(&origin)
                .with_context(|| format!("invalid sale origin in DB for code={code}: {origin}"))?;
            sales.push(SaleRecord {
                code,
                description,
                quantity,
                date,
                origin,
            });
        }

        let stock_as_of = sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT stock_as_of FROM inventory_meta WHERE singleton",
        )
        .persistent(false)
        .fetch_optional(&self.pool)
        .await
        .context("select inventory_meta failed")?
        .flatten();

        Ok(InventoryData {
            stock,
            stock_as_of,
            sales,
        })
    }

    async fn replace_stock(
        &self,
        records: &[StockRecord],
        as_of_date: NaiveDate,
    ) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        sqlx::query("DELETE FROM stock_snapshot")
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("delete stock_snapshot failed")?;
        let inserted = self.insert_stock(&mut tx, records).await?;
        set_stock_as_of(&mut tx, Some(as_of_date)).await?;

        tx.commit().await.context("commit transaction failed")?;
        Ok(inserted)
    }

    async fn append_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;
        let inserted = self.insert_sales(&mut tx, records).await?;
        tx.commit().await.context("commit transaction failed")?;
        Ok(inserted)
    }

    async fn replace_historical_sales(&self, records: &[SaleRecord]) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        let removed = sqlx::query("DELETE FROM sale_records WHERE origin = $1")
            .persistent(false)
            .bind(SaleOrigin::Historical.as_str())
            .execute(&mut *tx)
            .await
            .context("delete historical sale_records failed")?
            .rows_affected();
        let inserted = self.insert_sales(&mut tx, records).await?;

        tx.commit().await.context("commit transaction failed")?;
        tracing::debug!(removed, inserted, "historical sale_records replaced");
        Ok(inserted)
    }

    async fn restore(&self, data: &InventoryData) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        delete_all(&mut tx).await?;
        self.insert_stock(&mut tx, &data.stock).await?;
        self.insert_sales(&mut tx, &data.sales).await?;
        set_stock_as_of(&mut tx, data.stock_as_of).await?;

        tx.commit().await.context("commit transaction failed")?;
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;
        delete_all(&mut tx).await?;
        set_stock_as_of(&mut tx, None).await?;
        tx.commit().await.context("commit transaction failed")?;
        Ok(())
    }
}
