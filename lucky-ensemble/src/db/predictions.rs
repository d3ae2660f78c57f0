//! Ensemble prediction persistence
//!
//! Selected numbers and model contributions are stored as JSON text.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

use lucky_common::time::{format_timestamp, parse_date, parse_timestamp};
use lucky_common::{Error, Result};

use crate::models::{EnsemblePrediction, ScoredNumber};
use crate::utils::retry_on_lock;

const PREDICTION_COLUMNS: &str = "p.id, p.session_id, p.for_draw_date, p.final_two_digit, p.final_three_digit, \
     p.overall_confidence, p.prediction_summary, p.model_contributions, p.total_data_points, p.created_at";

/// Whole-object upsert of a prediction
///
/// A session holds at most one prediction; saving a second prediction with
/// a different id for the same session fails.
pub async fn save_prediction(pool: &SqlitePool, prediction: &EnsemblePrediction, max_wait_ms: u64) -> Result<()> {
    let id = prediction.id.to_string();
    let session_id = prediction.session_ref.to_string();
    let for_draw_date = prediction.for_draw_date.to_string();
    let two_digit = to_json(&prediction.final_two_digit, "final_two_digit")?;
    let three_digit = to_json(&prediction.final_three_digit, "final_three_digit")?;
    let contributions = to_json(&prediction.model_contributions, "model_contributions")?;
    let total_data_points = i64::try_from(prediction.total_data_points).unwrap_or(i64::MAX);
    let created_at = format_timestamp(&prediction.created_at);

    retry_on_lock("save_prediction", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO ensemble_predictions (
                id, session_id, for_draw_date, final_two_digit, final_three_digit,
                overall_confidence, prediction_summary, model_contributions,
                total_data_points, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                final_two_digit = excluded.final_two_digit,
                final_three_digit = excluded.final_three_digit,
                overall_confidence = excluded.overall_confidence,
                prediction_summary = excluded.prediction_summary,
                model_contributions = excluded.model_contributions,
                total_data_points = excluded.total_data_points
            "#,
        )
        .bind(&id)
        .bind(&session_id)
        .bind(&for_draw_date)
        .bind(&two_digit)
        .bind(&three_digit)
        .bind(prediction.overall_confidence)
        .bind(&prediction.prediction_summary)
        .bind(&contributions)
        .bind(total_data_points)
        .bind(&created_at)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Prediction produced by a session, if any
pub async fn load_for_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<EnsemblePrediction>> {
    let sql = format!(
        "SELECT {} FROM ensemble_predictions p WHERE p.session_id = ?",
        PREDICTION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(prediction_from_row).transpose()
}

/// Newest prediction whose session is completed or locked
pub async fn latest_completed(pool: &SqlitePool) -> Result<Option<EnsemblePrediction>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM ensemble_predictions p
        JOIN prediction_sessions s ON s.id = p.session_id
        WHERE s.status IN ('completed', 'locked')
        ORDER BY p.created_at DESC, p.rowid DESC
        LIMIT 1
        "#,
        PREDICTION_COLUMNS
    );
    let row = sqlx::query(&sql).fetch_optional(pool).await?;

    row.as_ref().map(prediction_from_row).transpose()
}

fn to_json<T: serde::Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", field, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", field, e)))
}

fn prediction_from_row(row: &SqliteRow) -> Result<EnsemblePrediction> {
    let id: String = row.try_get("id")?;
    let session_id: String = row.try_get("session_id")?;
    let for_draw_date: String = row.try_get("for_draw_date")?;
    let two_digit: String = row.try_get("final_two_digit")?;
    let three_digit: String = row.try_get("final_three_digit")?;
    let contributions: String = row.try_get("model_contributions")?;
    let total_data_points: i64 = row.try_get("total_data_points")?;
    let created_at: String = row.try_get("created_at")?;

    let parse_uuid = |raw: &str| {
        Uuid::parse_str(raw).map_err(|e| Error::InvalidInput(format!("Invalid uuid '{}': {}", raw, e)))
    };

    Ok(EnsemblePrediction {
        id: parse_uuid(&id)?,
        session_ref: parse_uuid(&session_id)?,
        for_draw_date: parse_date(&for_draw_date)?,
        final_two_digit: from_json::<Vec<ScoredNumber>>(&two_digit, "final_two_digit")?,
        final_three_digit: from_json::<Vec<ScoredNumber>>(&three_digit, "final_three_digit")?,
        overall_confidence: row.try_get("overall_confidence")?,
        prediction_summary: row.try_get("prediction_summary")?,
        model_contributions: from_json::<BTreeMap<String, String>>(&contributions, "model_contributions")?,
        total_data_points: usize::try_from(total_data_points).unwrap_or_default(),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_tables, sessions};
    use crate::models::{CombinedPrediction, PredictionSession, SessionStatus, DEFAULT_WINDOW_DAYS};
    use chrono::NaiveDate;
    use lucky_common::db::init_memory_database;

    async fn setup() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        init_tables(&pool).await.unwrap();
        pool
    }

    fn combined(number: &str) -> CombinedPrediction {
        let mut contributions = BTreeMap::new();
        contributions.insert("text_source".to_string(), "1 two-digit".to_string());
        CombinedPrediction {
            final_two_digit: vec![ScoredNumber {
                number: number.to_string(),
                confidence: 0.65,
                reasoning: "text_source: seen".to_string(),
            }],
            final_three_digit: vec![],
            overall_confidence: 0.65,
            prediction_summary: format!("Top two-digit: {}", number),
            model_contributions: contributions,
        }
    }

    async fn session_with_status(pool: &SqlitePool, day: u32, status: SessionStatus) -> PredictionSession {
        let mut session = PredictionSession::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), DEFAULT_WINDOW_DAYS);
        sessions::insert_session(pool, &session, 100).await.unwrap();
        if status != SessionStatus::CollectingData {
            session.transition_to(SessionStatus::Analyzing).unwrap();
            match status {
                SessionStatus::Failed => {
                    session.fail("boom").unwrap();
                }
                _ => {
                    session.complete(1).unwrap();
                    if status == SessionStatus::Locked {
                        session.transition_to(SessionStatus::Locked).unwrap();
                    }
                }
            }
            sessions::save_session(pool, &session, 100).await.unwrap();
        }
        session
    }

    #[tokio::test]
    async fn test_save_and_load_for_session() {
        let pool = setup().await;
        let session = session_with_status(&pool, 16, SessionStatus::Completed).await;
        let prediction = EnsemblePrediction::from_combined(&session, combined("23"), 3);
        save_prediction(&pool, &prediction, 100).await.unwrap();

        let loaded = load_for_session(&pool, session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, prediction.id);
        assert_eq!(loaded.final_two_digit, prediction.final_two_digit);
        assert_eq!(loaded.model_contributions, prediction.model_contributions);
        assert_eq!(loaded.total_data_points, 3);

        assert!(load_for_session(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_prediction_per_session() {
        let pool = setup().await;
        let session = session_with_status(&pool, 16, SessionStatus::Completed).await;
        save_prediction(&pool, &EnsemblePrediction::from_combined(&session, combined("23"), 0), 100)
            .await
            .unwrap();

        let second = EnsemblePrediction::from_combined(&session, combined("45"), 0);
        assert!(save_prediction(&pool, &second, 100).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_completed_skips_unfinished_sessions() {
        let pool = setup().await;
        assert!(latest_completed(&pool).await.unwrap().is_none());

        let locked = session_with_status(&pool, 1, SessionStatus::Locked).await;
        save_prediction(&pool, &EnsemblePrediction::from_combined(&locked, combined("11"), 0), 100)
            .await
            .unwrap();

        let completed = session_with_status(&pool, 16, SessionStatus::Completed).await;
        save_prediction(&pool, &EnsemblePrediction::from_combined(&completed, combined("23"), 0), 100)
            .await
            .unwrap();

        // Prediction stored against a session that later failed to publish
        let failed = session_with_status(&pool, 20, SessionStatus::Failed).await;
        save_prediction(&pool, &EnsemblePrediction::from_combined(&failed, combined("99"), 0), 100)
            .await
            .unwrap();

        let latest = latest_completed(&pool).await.unwrap().unwrap();
        assert_eq!(latest.session_ref, completed.id);
    }
}
