use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

// Advisory locks are scoped to the Postgres session, so the lock holds on to the connection it
// was taken on. Used to keep two alert runs for the same reference date from interleaving.
const LOCK_NAMESPACE: i64 = 0x5354_4F43_4B57; // "STOCKW"

fn lock_key_for_date(reference_date: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ (reference_date.num_days_from_ce() as i64)
}

pub struct ReferenceDateLock {
    conn: PoolConnection<Postgres>,
    key: i64,
}

impl ReferenceDateLock {
    /// `Ok(None)` when another session already holds the lock for this date.
    pub async fn try_acquire(
        pool: &sqlx::PgPool,
        reference_date: NaiveDate,
    ) -> anyhow::Result<Option<Self>> {
        let key = lock_key_for_date(reference_date);
        let mut conn = pool
            .acquire()
            .await
            .context("acquire connection for advisory lock failed")?;

        let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .persistent(false)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;

        Ok(acquired.0.then_some(Self { conn, key }))
    }

    pub async fn release(mut self) -> anyhow::Result<()> {
        let key = self.key;
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .persistent(false)
            .bind(key)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to release advisory lock (key={key})"))?;
        Ok(())
    }
}
