//! Prediction session persistence

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use lucky_common::time::{format_timestamp, parse_date, parse_timestamp};
use lucky_common::{Error, Result};

use crate::models::{CollectionWindow, PredictionSession, SessionStatus};
use crate::utils::retry_on_lock;

const SESSION_COLUMNS: &str = "id, for_draw_date, window_start, window_end, status, created_at, \
     start_time, end_time, processing_time, total_data_points, failure_reason";

/// Bound values of one session row
struct SessionRow {
    id: String,
    for_draw_date: String,
    window_start: String,
    window_end: String,
    status: &'static str,
    created_at: String,
    start_time: Option<String>,
    end_time: Option<String>,
    processing_time: Option<f64>,
    total_data_points: i64,
    failure_reason: Option<String>,
}

impl SessionRow {
    fn from_session(session: &PredictionSession) -> Self {
        Self {
            id: session.id.to_string(),
            for_draw_date: session.for_draw_date.to_string(),
            window_start: session.collection_window.start.to_string(),
            window_end: session.collection_window.end.to_string(),
            status: session.status.as_str(),
            created_at: format_timestamp(&session.created_at),
            start_time: session.start_time.as_ref().map(format_timestamp),
            end_time: session.end_time.as_ref().map(format_timestamp),
            processing_time: session.processing_time,
            total_data_points: i64::try_from(session.total_data_points).unwrap_or(i64::MAX),
            failure_reason: session.failure_reason.clone(),
        }
    }
}

/// Insert a new session unless an active one exists for its draw date
///
/// Returns true when the row was written.
pub async fn insert_session(pool: &SqlitePool, session: &PredictionSession, max_wait_ms: u64) -> Result<bool> {
    let row = SessionRow::from_session(session);

    retry_on_lock("insert_session", max_wait_ms, || async {
        let sql = format!(
            "INSERT INTO prediction_sessions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
            SESSION_COLUMNS
        );
        let result = bind_session(sqlx::query(&sql), &row).execute(pool).await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Whole-object upsert of a session
pub async fn save_session(pool: &SqlitePool, session: &PredictionSession, max_wait_ms: u64) -> Result<()> {
    let row = SessionRow::from_session(session);

    retry_on_lock("save_session", max_wait_ms, || async {
        let sql = format!(
            r#"
            INSERT INTO prediction_sessions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                processing_time = excluded.processing_time,
                total_data_points = excluded.total_data_points,
                failure_reason = excluded.failure_reason
            "#,
            SESSION_COLUMNS
        );
        bind_session(sqlx::query(&sql), &row).execute(pool).await?;
        Ok(())
    })
    .await
}

fn bind_session<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    row: &'q SessionRow,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&row.id)
        .bind(&row.for_draw_date)
        .bind(&row.window_start)
        .bind(&row.window_end)
        .bind(row.status)
        .bind(&row.created_at)
        .bind(&row.start_time)
        .bind(&row.end_time)
        .bind(row.processing_time)
        .bind(row.total_data_points)
        .bind(&row.failure_reason)
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, id: Uuid) -> Result<Option<PredictionSession>> {
    let sql = format!("SELECT {} FROM prediction_sessions WHERE id = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(pool).await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Newest non-failed session for a draw date
pub async fn find_active_session(pool: &SqlitePool, date: NaiveDate) -> Result<Option<PredictionSession>> {
    let sql = format!(
        "SELECT {} FROM prediction_sessions WHERE for_draw_date = ? AND status != 'failed' \
         ORDER BY created_at DESC LIMIT 1",
        SESSION_COLUMNS
    );
    let row = sqlx::query(&sql).bind(date.to_string()).fetch_optional(pool).await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Conditional status change; false when the stored status was not `from`
pub async fn transition_status(
    pool: &SqlitePool,
    id: Uuid,
    from: SessionStatus,
    to: SessionStatus,
    max_wait_ms: u64,
) -> Result<bool> {
    let id = id.to_string();

    let updated = retry_on_lock("transition_status", max_wait_ms, || async {
        let result = sqlx::query("UPDATE prediction_sessions SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(&id)
            .bind(from.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    })
    .await?;

    tracing::debug!(session_id = %id, from = %from, to = %to, updated, "Conditional status transition");
    Ok(updated)
}

/// Lock every completed session for `date`
pub async fn lock_completed(pool: &SqlitePool, date: NaiveDate, max_wait_ms: u64) -> Result<u64> {
    let date = date.to_string();

    retry_on_lock("lock_completed", max_wait_ms, || async {
        let result = sqlx::query("UPDATE prediction_sessions SET status = ? WHERE for_draw_date = ? AND status = ?")
            .bind(SessionStatus::Locked.as_str())
            .bind(&date)
            .bind(SessionStatus::Completed.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    })
    .await
}

fn session_from_row(row: &SqliteRow) -> Result<PredictionSession> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|e| Error::InvalidInput(format!("Invalid session id '{}': {}", id, e)))?;

    let for_draw_date: String = row.try_get("for_draw_date")?;
    let window_start: String = row.try_get("window_start")?;
    let window_end: String = row.try_get("window_end")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let start_time: Option<String> = row.try_get("start_time")?;
    let end_time: Option<String> = row.try_get("end_time")?;
    let total_data_points: i64 = row.try_get("total_data_points")?;

    Ok(PredictionSession {
        id,
        for_draw_date: parse_date(&for_draw_date)?,
        collection_window: CollectionWindow {
            start: parse_date(&window_start)?,
            end: parse_date(&window_end)?,
        },
        status: status.parse()?,
        created_at: parse_timestamp(&created_at)?,
        start_time: start_time.as_deref().map(parse_timestamp).transpose()?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        processing_time: row.try_get("processing_time")?,
        total_data_points: usize::try_from(total_data_points).unwrap_or_default(),
        failure_reason: row.try_get("failure_reason")?,
    })
}
