use crate::domain::alert::AlertRun;
use anyhow::Context;

pub async fn persist_success(pool: &sqlx::PgPool, run: &AlertRun) -> anyhow::Result<uuid::Uuid> {
    let alerts = serde_json::to_value(&run.alerts).context("serialize alerts failed")?;
    let alert_count = i32::try_from(run.alerts.len()).context("alert count overflows i32")?;

    let run_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO alert_runs (id, reference_date, generated_at, status, error, alert_count, alerts) \
         VALUES ($1, $2, $3, 'success', NULL, $4, $5) \
         RETURNING id",
    )
    .persistent(false)
    .bind(uuid::Uuid::new_v4())
    .bind(run.reference_date)
    .bind(run.generated_at)
    .bind(alert_count)
    .bind(alerts)
    .fetch_one(pool)
    .await
    .context("insert alert_runs failed")?;

    Ok(run_id)
}

pub async fn persist_failure(
    pool: &sqlx::PgPool,
    reference_date: chrono::NaiveDate,
    generated_at: chrono::DateTime<chrono::Utc>,
    error: &str,
) -> anyhow::Result<uuid::Uuid> {
    let run_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO alert_runs (id, reference_date, generated_at, status, error, alert_count, alerts) \
         VALUES ($1, $2, $3, 'error', $4, 0, NULL) \
         RETURNING id",
    )
    .persistent(false)
    .bind(uuid::Uuid::new_v4())
    .bind(reference_date)
    .bind(generated_at)
    .bind(error)
    .fetch_one(pool)
    .await
    .context("insert error alert_runs failed")?;

    Ok(run_id)
}
