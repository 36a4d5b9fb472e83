//! Application state for the meter API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::imaging::ImageStore;
use crate::recognition::ReadingRecognizer;
use crate::repository::MeasureRepository;
use crate::service::MeasureService;

pub struct AppState {
    pub service: MeasureService,
}

impl AppState {
    /// Wire up the service from its collaborators. This is the composition
    /// root: the pool, image store and recognizer are owned here and passed
    /// down explicitly, never reached through module state.
    pub async fn new(
        database_url: &str,
        content_dir: PathBuf,
        recognizer: Arc<dyn ReadingRecognizer>,
    ) -> Result<Self> {
        tracing::info!("Connecting to database: {}", database_url);

        // An in-memory SQLite database exists per connection, so tests using
        // `sqlite::memory:` must not fan out over a pool.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Self::run_migrations(&pool).await?;

        let service = MeasureService::new(
            MeasureRepository::new(pool),
            recognizer,
            ImageStore::new(content_dir),
        );

        Ok(Self { service })
    }

    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        // The UNIQUE constraint on (customer_code, measure_type,
        // billing_month) is the authoritative guard for the
        // one-reading-per-type-per-month rule; the service's pre-check is a
        // fast-fail only.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS measures (
                measure_uuid     TEXT PRIMARY KEY,
                customer_code    TEXT NOT NULL,
                measure_type     TEXT NOT NULL,
                measure_datetime TEXT NOT NULL,
                billing_month    TEXT NOT NULL,
                measure_value    REAL NOT NULL,
                image_url        TEXT NOT NULL,
                confirmed        INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL,
                UNIQUE (customer_code, measure_type, billing_month)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_measures_customer ON measures(customer_code)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}
