use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use stockwatch_core::alerts::report::write_report_csv;
use stockwatch_core::alerts::AlertPolicy;
use stockwatch_core::domain::alert::AlertRun;
use stockwatch_core::domain::records::InventoryData;
use stockwatch_core::storage::lock::ReferenceDateLock;
use stockwatch_core::storage::{InventoryStore, PgInventoryStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod summary;

#[derive(Debug, Parser)]
#[command(name = "stockwatch_worker")]
struct Args {
    /// Reference date (YYYY-MM-DD). Defaults to today at STORE_UTC_OFFSET_HOURS.
    #[arg(long)]
    reference_date: Option<String>,

    /// Read stock and sales from a backup file instead of the database.
    #[arg(long)]
    from_backup: Option<PathBuf>,

    /// Write the alert table as CSV to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do everything except writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockwatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let reference_date = settings.reference_date(args.reference_date.as_deref())?;
    let policy = AlertPolicy::from_env();

    let needs_db = args.from_backup.is_none() || !args.dry_run;
    let store = if needs_db {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        stockwatch_core::storage::migrate(&pool).await?;
        Some(PgInventoryStore::new(pool)?)
    } else {
        None
    };

    let data = match (&args.from_backup, &store) {
        (Some(path), _) => load_backup(path)?,
        (None, Some(store)) => store.load().await?,
        (None, None) => anyhow::bail!("no data source: pass --from-backup or set DATABASE_URL"),
    };

    let run = AlertRun {
        reference_date,
        generated_at: chrono::Utc::now(),
        alerts: data.alerts(reference_date, &policy),
    };
    summary::log_run(&run, &data);

    let report_result = match &args.report {
        Some(path) => write_report(path, &run),
        None => Ok(()),
    };

    let Some(store) = store.filter(|_| !args.dry_run) else {
        tracing::info!(%reference_date, dry_run = args.dry_run, "alert run not persisted");
        return report_result;
    };

    let pool = store.pool();
    let Some(lock) = ReferenceDateLock::try_acquire(pool, reference_date).await? else {
        tracing::warn!(%reference_date, "reference_date lock not acquired; another run in progress");
        return report_result;
    };

    let persisted = persist_run(pool, &run, &report_result).await;
    if let Err(err) = lock.release().await {
        tracing::warn!(%reference_date, error = %err, "reference_date lock release failed");
    }
    run_outcome(report_result, persisted)
}

async fn persist_run(
    pool: &sqlx::PgPool,
    run: &AlertRun,
    report_result: &anyhow::Result<()>,
) -> anyhow::Result<()> {
    let reference_date = run.reference_date;
    match report_result {
        Ok(()) => {
            let run_id = stockwatch_core::storage::alert_runs::persist_success(pool, run).await?;
            tracing::info!(%reference_date, %run_id, alerts = run.alerts.len(), "persisted alert run");
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(err);
            let run_id = stockwatch_core::storage::alert_runs::persist_failure(
                pool,
                reference_date,
                run.generated_at,
                &format!("{:#}", err),
            )
            .await?;
            tracing::error!(%reference_date, %run_id, error = %err, "alert run failed");
        }
    }
    Ok(())
}

/// The report error wins; a persistence error only surfaces when the report itself succeeded.
fn run_outcome(report: anyhow::Result<()>, persisted: anyhow::Result<()>) -> anyhow::Result<()> {
    report?;
    persisted.context("persist alert run failed")
}

fn load_backup(path: &Path) -> anyhow::Result<InventoryData> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read backup {}", path.display()))?;
    let backup = stockwatch_core::ingest::backup::import_backup(&bytes)
        .with_context(|| format!("failed to load backup {}", path.display()))?;
    Ok(backup.data)
}

fn write_report(path: &Path, run: &AlertRun) -> anyhow::Result<()> {
    let body = write_report_csv(&run.alerts)?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = run.alerts.len(), "wrote alert report");
    Ok(())
}

fn init_sentry(settings: &stockwatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
