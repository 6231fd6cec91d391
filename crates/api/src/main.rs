use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockwatch_core::alerts::dashboard::DashboardStats;
use stockwatch_core::alerts::report::{report_file_name, write_report_csv};
use stockwatch_core::alerts::{apply_filters, AlertFilter, AlertFilterParams, AlertPolicy, AlertView};
use stockwatch_core::config::Settings;
use stockwatch_core::domain::alert::Alert;
use stockwatch_core::ingest::backup::{export_backup, import_backup, Backup};
use stockwatch_core::ingest::historical::import_historical_sales;
use stockwatch_core::ingest::sheet::{import_daily_sales, import_stock, SheetOptions};
use stockwatch_core::storage::{InventoryStore, MemoryInventoryStore, PgInventoryStore};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = connect_store(&settings).await;
    let state = AppState {
        store,
        settings: Arc::new(settings),
        policy: AlertPolicy::from_env(),
        sheet: SheetOptions::from_env(),
    };

    let app = router(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// No `DATABASE_URL` means a development run on the memory store. A configured but unusable
/// database starts the API in degraded mode instead.
async fn connect_store(settings: &Settings) -> Option<Arc<dyn InventoryStore>> {
    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL missing; using in-memory store, uploads will not persist");
        return Some(Arc::new(MemoryInventoryStore::default()));
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
            return None;
        }
    };

    if let Err(e) = stockwatch_core::storage::migrate(&pool).await {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
        return None;
    }

    match PgInventoryStore::new(pool) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "invalid store configuration; starting API in degraded mode");
            None
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/alerts", get(list_alerts))
        .route("/alerts/report.csv", get(alerts_report))
        .route("/dashboard", get(dashboard))
        .route("/uploads/stock", post(upload_stock))
        .route("/uploads/sales", post(upload_sales))
        .route("/uploads/historical", post(upload_historical))
        .route("/backup", get(download_backup).post(restore_backup))
        .route("/data", delete(clear_data))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    store: Option<Arc<dyn InventoryStore>>,
    settings: Arc<Settings>,
    policy: AlertPolicy,
    sheet: SheetOptions,
}

type ApiError = (StatusCode, String);

impl AppState {
    fn store(&self) -> Result<&dyn InventoryStore, ApiError> {
        self.store.as_deref().ok_or((
            StatusCode::SERVICE_UNAVAILABLE,
            "storage unavailable".to_string(),
        ))
    }

    fn reference_date(&self, arg: Option<&str>) -> Result<NaiveDate, ApiError> {
        self.settings.reference_date(arg).map_err(bad_request)
    }

    async fn alerts(&self, reference_date: NaiveDate) -> Result<Vec<Alert>, ApiError> {
        let data = self.store()?.load().await.map_err(internal_error)?;
        Ok(data.alerts(reference_date, &self.policy))
    }
}

fn bad_request(err: anyhow::Error) -> ApiError {
    (StatusCode::BAD_REQUEST, format!("{err:#}"))
}

fn internal_error(err: anyhow::Error) -> ApiError {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %format!("{err:#}"), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error".to_string(),
    )
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceQuery {
    reference_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertsQuery {
    reference_date: Option<String>,
    #[serde(flatten)]
    filter: AlertFilterParams,
}

#[derive(Debug, Serialize)]
struct AlertsResponse {
    reference_date: NaiveDate,
    view: AlertView,
    total: usize,
    matched: usize,
    alerts: Vec<Alert>,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let reference_date = state.reference_date(query.reference_date.as_deref())?;
    let all = state.alerts(reference_date).await?;

    let filter = AlertFilter::from_params(&query.filter);
    let alerts = apply_filters(&all, &filter);

    Ok(Json(AlertsResponse {
        reference_date,
        view: AlertView::classify(all.len(), alerts.len()),
        total: all.len(),
        matched: alerts.len(),
        alerts,
    }))
}

async fn alerts_report(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reference_date = state.reference_date(query.reference_date.as_deref())?;
    let alerts = state.alerts(reference_date).await?;
    let body = write_report_csv(&alerts).map_err(internal_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report_file_name(reference_date)),
            ),
        ],
        body,
    ))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Json<DashboardStats>, ApiError> {
    let reference_date = state.reference_date(query.reference_date.as_deref())?;
    let data = state.store()?.load().await.map_err(internal_error)?;
    let alerts = data.alerts(reference_date, &state.policy);

    Ok(Json(DashboardStats::compute(&data, &alerts, reference_date)))
}

#[derive(Debug, Default, Deserialize)]
struct UploadQuery {
    /// Date the upload describes. Defaults to today.
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoricalQuery {
    /// First month, `YYYY-MM`.
    from: String,
    /// Last month, `YYYY-MM`.
    to: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    kind: &'static str,
    records: u64,
}

async fn upload_stock(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let date = state.reference_date(query.date.as_deref())?;
    let records = import_stock(&body, date, &state.sheet).map_err(bad_request)?;
    let written = state
        .store()?
        .replace_stock(&records, date)
        .await
        .map_err(internal_error)?;

    tracing::info!(%date, records = written, "stock snapshot replaced");
    Ok(Json(UploadResponse {
        kind: "stock",
        records: written,
    }))
}

async fn upload_sales(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let date = state.reference_date(query.date.as_deref())?;
    let records = import_daily_sales(&body, date, &state.sheet).map_err(bad_request)?;
    let written = state
        .store()?
        .append_sales(&records)
        .await
        .map_err(internal_error)?;

    tracing::info!(%date, records = written, "daily sales appended");
    Ok(Json(UploadResponse {
        kind: "sales",
        records: written,
    }))
}

async fn upload_historical(
    State(state): State<AppState>,
    Query(query): Query<HistoricalQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let records = import_historical_sales(&body, &query.from, &query.to, &state.sheet)
        .map_err(bad_request)?;
    let written = state
        .store()?
        .replace_historical_sales(&records)
        .await
        .map_err(internal_error)?;

    tracing::info!(from = %query.from, to = %query.to, records = written, "historical sales replaced");
    Ok(Json(UploadResponse {
        kind: "historical",
        records: written,
    }))
}

async fn download_backup(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let data = state.store()?.load().await.map_err(internal_error)?;
    let backup = Backup::new(data, chrono::Utc::now());
    let body = export_backup(&backup).map_err(internal_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", backup.file_name()),
            ),
        ],
        body,
    ))
}

#[derive(Debug, Serialize)]
struct RestoreResponse {
    stock: usize,
    sales: usize,
}

async fn restore_backup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RestoreResponse>, ApiError> {
    let backup = import_backup(&body).map_err(bad_request)?;
    state
        .store()?
        .restore(&backup.data)
        .await
        .map_err(internal_error)?;

    tracing::warn!(
        exported_at = %backup.exported_at,
        stock = backup.data.stock.len(),
        sales = backup.data.sales.len(),
        "inventory data replaced from backup"
    );
    Ok(Json(RestoreResponse {
        stock: backup.data.stock.len(),
        sales: backup.data.sales.len(),
    }))
}

async fn clear_data(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store()?.clear().await.map_err(internal_error)?;
    tracing::warn!("all inventory data cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::domain::alert::Level;

    const DAY: &str = "2026-06-30";

    fn state_with(store: Option<Arc<dyn InventoryStore>>) -> AppState {
        AppState {
            store,
            settings: Arc::new(Settings {
                database_url: None,
                sentry_dsn: None,
                store_utc_offset_hours: 0,
            }),
            policy: AlertPolicy::default(),
            sheet: SheetOptions::default(),
        }
    }

    fn memory_state() -> AppState {
        state_with(Some(Arc::new(MemoryInventoryStore::default())))
    }

    fn on(date: &str) -> Query<UploadQuery> {
        Query(UploadQuery {
            date: Some(date.to_string()),
        })
    }

    fn alerts_query(filter: AlertFilterParams) -> Query<AlertsQuery> {
        Query(AlertsQuery {
            reference_date: Some(DAY.to_string()),
            filter,
        })
    }

    async fn seed(state: &AppState) {
        upload_stock(
            State(state.clone()),
            on(DAY),
            Bytes::from_static(b"CODE,DESC,QTY\nA,Tire A,100\nC,Tire C,50\n"),
        )
        .await
        .unwrap();
        for date in ["2026-06-29", DAY] {
            upload_sales(
                State(state.clone()),
                on(date),
                Bytes::from_static(b"CODE,DESC,QTY\nA,Tire A,10\nB,Tire B,5\n"),
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn empty_store_reports_no_data() {
        let state = memory_state();
        let Json(res) = list_alerts(State(state), alerts_query(AlertFilterParams::default()))
            .await
            .unwrap();
        assert_eq!(res.view, AlertView::NoData);
        assert_eq!(res.total, 0);
    }

    #[tokio::test]
    async fn uploads_feed_the_alert_list() {
        let state = memory_state();
        seed(&state).await;

        let Json(res) = list_alerts(State(state), alerts_query(AlertFilterParams::default()))
            .await
            .unwrap();
        assert_eq!(res.view, AlertView::Ok);
        let summary: Vec<_> = res.alerts.iter().map(|a| (a.code.as_str(), a.level)).collect();
        assert_eq!(
            summary,
            vec![
                ("B", Level::OutOfStock),
                ("A", Level::Critical),
                ("C", Level::NoMovement),
            ]
        );
    }

    #[tokio::test]
    async fn filter_with_no_matches_is_distinguished() {
        let state = memory_state();
        seed(&state).await;

        let Json(res) = list_alerts(
            State(state),
            alerts_query(AlertFilterParams {
                search: Some("does not exist".to_string()),
                days_of_stock_min: Some("not a number".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(res.view, AlertView::NoMatches);
        assert_eq!(res.total, 3);
        assert_eq!(res.matched, 0);
    }

    #[tokio::test]
    async fn dashboard_counts_current_data() {
        let state = memory_state();
        seed(&state).await;

        let Json(stats) = dashboard(
            State(state),
            Query(ReferenceQuery {
                reference_date: Some(DAY.to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(stats.total_stock, 150);
        assert_eq!(stats.total_sales_today, 15.0);
        assert_eq!(stats.critical_alerts, 2);
        assert_eq!(stats.out_of_stock, 1);
    }

    #[tokio::test]
    async fn backup_restore_and_clear() {
        let source = memory_state();
        seed(&source).await;
        let data = source.store().unwrap().load().await.unwrap();
        let bytes = export_backup(&Backup::new(data.clone(), chrono::Utc::now())).unwrap();

        let target = memory_state();
        let Json(res) = restore_backup(State(target.clone()), Bytes::from(bytes))
            .await
            .unwrap();
        assert_eq!(res.stock, 2);
        assert_eq!(res.sales, 4);
        assert_eq!(target.store().unwrap().load().await.unwrap(), data);

        let status = clear_data(State(target.clone())).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(target.store().unwrap().load().await.unwrap().is_empty());
    }

    fn historical(from: &str, to: &str) -> Query<HistoricalQuery> {
        Query(HistoricalQuery {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    #[tokio::test]
    async fn historical_reupload_replaces_previous_set() {
        let state = memory_state();
        for _ in 0..2 {
            let Json(res) = upload_historical(
                State(state.clone()),
                historical("2026-04", "2026-06"),
                Bytes::from_static(b"CODE,DESC,QTY\nA,Tire A,910\n"),
            )
            .await
            .unwrap();
            assert_eq!(res.records, 30);
        }
        assert_eq!(state.store().unwrap().load().await.unwrap().sales.len(), 30);

        let Json(res) = list_alerts(State(state), alerts_query(AlertFilterParams::default()))
            .await
            .unwrap();
        assert_eq!(res.alerts[0].code, "A");
        assert_eq!(res.alerts[0].average_daily_sales, 10.0);
    }

    #[tokio::test]
    async fn restores_legacy_browser_backup() {
        let state = memory_state();
        let body = serde_json::json!({
            "stockActual": [
                {"codigo": "A", "descripcion": "Tire A", "cantidad": 40, "fecha": DAY, "tipo": "stock"}
            ],
            "ventasDiarias": [
                {"codigo": "A", "descripcion": "Tire A", "cantidad": 4, "fecha": DAY, "tipo": "ventas"}
            ],
            "ventasHistoricas": [],
            "ultimaFechaStock": DAY,
            "fechaExportacion": "2026-06-30T21:00:00.000Z",
            "version": "2.0"
        });

        let Json(res) = restore_backup(State(state.clone()), Bytes::from(body.to_string()))
            .await
            .unwrap();
        assert_eq!((res.stock, res.sales), (1, 1));

        let Json(res) = list_alerts(State(state), alerts_query(AlertFilterParams::default()))
            .await
            .unwrap();
        assert_eq!(res.alerts[0].days_of_stock_remaining, 10);
        assert_eq!(res.alerts[0].level, Level::Critical);
    }

    #[tokio::test]
    async fn rejects_bad_input_with_400() {
        let state = memory_state();

        let err = restore_backup(State(state.clone()), Bytes::from_static(b"{not json"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = upload_historical(
            State(state.clone()),
            historical("2026-05", "2026-01"),
            Bytes::from_static(b"CODE,DESC,QTY\nA,Tire A,10\n"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = upload_stock(State(state), on("30/06/2026"), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn degraded_mode_returns_503() {
        let state = state_with(None);
        let err = list_alerts(State(state), alerts_query(AlertFilterParams::default()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    }
}
