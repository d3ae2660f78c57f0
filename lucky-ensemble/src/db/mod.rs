//! SQLite persistence for lucky-ensemble
//!
//! `SqliteStore` implements both `RecordSource` and `PredictionStore` over
//! one pool. Tables are created on startup with `CREATE TABLE IF NOT EXISTS`.

pub mod predictions;
pub mod records;
pub mod sessions;

use crate::models::{DrawResult, EnsemblePrediction, PredictionSession, Record, SessionStatus};
use crate::types::{PredictionStore, RecordQuery, RecordSource};
use crate::utils::DEFAULT_MAX_LOCK_WAIT_MS;
use async_trait::async_trait;
use chrono::NaiveDate;
use lucky_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create lucky-ensemble tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_records (
            id TEXT PRIMARY KEY,
            source_kind TEXT NOT NULL,
            raw_text TEXT NOT NULL DEFAULT '',
            extracted_numbers TEXT NOT NULL DEFAULT '[]',
            keywords TEXT NOT NULL DEFAULT '[]',
            sentiment REAL NOT NULL DEFAULT 0.5,
            relevance REAL NOT NULL DEFAULT 1.0,
            timestamp TEXT NOT NULL,
            processing_status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_content_records_timestamp ON content_records(timestamp)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS draw_results (
            draw_date TEXT PRIMARY KEY,
            winning_number TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prediction_sessions (
            id TEXT PRIMARY KEY,
            for_draw_date TEXT NOT NULL,
            window_start TEXT NOT NULL,
            window_end TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            processing_time REAL,
            total_data_points INTEGER NOT NULL DEFAULT 0,
            failure_reason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one non-failed session per draw date
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_prediction_sessions_active_date
        ON prediction_sessions(for_draw_date) WHERE status != 'failed'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ensemble_predictions (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE REFERENCES prediction_sessions(id),
            for_draw_date TEXT NOT NULL,
            final_two_digit TEXT NOT NULL,
            final_three_digit TEXT NOT NULL,
            overall_confidence REAL NOT NULL,
            prediction_summary TEXT NOT NULL,
            model_contributions TEXT NOT NULL,
            total_data_points INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (content_records, draw_results, prediction_sessions, ensemble_predictions)"
    );

    Ok(())
}

/// SQLite-backed record source and prediction store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteStore {
    /// Wrap `pool`, creating tables as needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        init_tables(&pool).await?;
        Ok(Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        })
    }

    pub fn with_max_lock_wait(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    /// Store an ingested record
    pub async fn insert_record(&self, record: &Record) -> Result<()> {
        records::insert_record(&self.pool, record, self.max_lock_wait_ms).await
    }

    /// Store a draw result, replacing any result for the same date
    pub async fn insert_draw(&self, draw: &DrawResult) -> Result<()> {
        records::insert_draw(&self.pool, draw, self.max_lock_wait_ms).await
    }
}

#[async_trait]
impl RecordSource for SqliteStore {
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        records::query_records(&self.pool, query).await
    }

    async fn query_recent_draws(&self, before: NaiveDate, count: usize) -> Result<Vec<DrawResult>> {
        records::query_recent_draws(&self.pool, before, count).await
    }
}

#[async_trait]
impl PredictionStore for SqliteStore {
    async fn insert_session(&self, session: &PredictionSession) -> Result<bool> {
        sessions::insert_session(&self.pool, session, self.max_lock_wait_ms).await
    }

    async fn update_session(&self, session: &PredictionSession) -> Result<()> {
        sessions::save_session(&self.pool, session, self.max_lock_wait_ms).await
    }

    async fn load_session(&self, id: Uuid) -> Result<Option<PredictionSession>> {
        sessions::load_session(&self.pool, id).await
    }

    async fn find_active_session(&self, date: NaiveDate) -> Result<Option<PredictionSession>> {
        sessions::find_active_session(&self.pool, date).await
    }

    async fn transition_status(&self, id: Uuid, from: SessionStatus, to: SessionStatus) -> Result<bool> {
        sessions::transition_status(&self.pool, id, from, to, self.max_lock_wait_ms).await
    }

    async fn lock_completed(&self, date: NaiveDate) -> Result<u64> {
        sessions::lock_completed(&self.pool, date, self.max_lock_wait_ms).await
    }

    async fn save_prediction(&self, prediction: &EnsemblePrediction) -> Result<()> {
        predictions::save_prediction(&self.pool, prediction, self.max_lock_wait_ms).await
    }

    async fn prediction_for_session(&self, session_id: Uuid) -> Result<Option<EnsemblePrediction>> {
        predictions::load_for_session(&self.pool, session_id).await
    }

    async fn latest_completed_prediction(&self) -> Result<Option<EnsemblePrediction>> {
        predictions::latest_completed(&self.pool).await
    }
}
