pub mod alerts;
pub mod domain;
pub mod ingest;
pub mod numeric;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        /// Hours east of UTC used to decide what "today" is. Defaults to 0.
        pub store_utc_offset_hours: i32,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let store_utc_offset_hours = match std::env::var("STORE_UTC_OFFSET_HOURS") {
                Ok(s) => s
                    .trim()
                    .parse::<i32>()
                    .with_context(|| format!("STORE_UTC_OFFSET_HOURS must be an integer (got {s:?})"))?,
                Err(_) => 0,
            };
            anyhow::ensure!(
                (-23..=23).contains(&store_utc_offset_hours),
                "STORE_UTC_OFFSET_HOURS must be within -23..=23 (got {store_utc_offset_hours})"
            );

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok().filter(|s| !s.trim().is_empty()),
                store_utc_offset_hours,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn reference_date(
            &self,
            reference_date_arg: Option<&str>,
        ) -> anyhow::Result<chrono::NaiveDate> {
            crate::time::store_date::resolve_reference_date(
                reference_date_arg,
                chrono::Utc::now(),
                self.store_utc_offset_hours,
            )
        }
    }
}
