//! Content record and draw history access

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use lucky_common::time::{format_timestamp, parse_date, parse_timestamp, start_of_day};
use lucky_common::{Error, Result};

use crate::models::record::clamp_unit;
use crate::models::{DrawResult, Record};
use crate::types::RecordQuery;
use crate::utils::retry_on_lock;

/// Insert or replace a content record
pub async fn insert_record(pool: &SqlitePool, record: &Record, max_wait_ms: u64) -> Result<()> {
    let id = record.id.to_string();
    let extracted_numbers = serde_json::to_string(&record.extracted_numbers)
        .map_err(|e| Error::Internal(format!("Failed to serialize extracted_numbers: {}", e)))?;
    let keywords = serde_json::to_string(&record.keywords)
        .map_err(|e| Error::Internal(format!("Failed to serialize keywords: {}", e)))?;
    let timestamp = format_timestamp(&record.timestamp);

    retry_on_lock("insert_record", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO content_records (
                id, source_kind, raw_text, extracted_numbers, keywords,
                sentiment, relevance, timestamp, processing_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source_kind = excluded.source_kind,
                raw_text = excluded.raw_text,
                extracted_numbers = excluded.extracted_numbers,
                keywords = excluded.keywords,
                sentiment = excluded.sentiment,
                relevance = excluded.relevance,
                timestamp = excluded.timestamp,
                processing_status = excluded.processing_status
            "#,
        )
        .bind(&id)
        .bind(record.source_kind.as_str())
        .bind(&record.raw_text)
        .bind(&extracted_numbers)
        .bind(&keywords)
        .bind(record.sentiment)
        .bind(record.relevance)
        .bind(&timestamp)
        .bind(record.processing_status.as_str())
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Insert or replace the draw result for its date
pub async fn insert_draw(pool: &SqlitePool, draw: &DrawResult, max_wait_ms: u64) -> Result<()> {
    let draw_date = draw.draw_date.to_string();

    retry_on_lock("insert_draw", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO draw_results (draw_date, winning_number) VALUES (?, ?)
            ON CONFLICT(draw_date) DO UPDATE SET winning_number = excluded.winning_number
            "#,
        )
        .bind(&draw_date)
        .bind(&draw.winning_number)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Records in the query window (both ends inclusive) with the given status
pub async fn query_records(pool: &SqlitePool, query: &RecordQuery) -> Result<Vec<Record>> {
    let from = format_timestamp(&start_of_day(query.window_start));
    let until = query
        .window_end
        .succ_opt()
        .map(|next| format_timestamp(&start_of_day(next)))
        .ok_or_else(|| Error::InvalidInput(format!("Window end {} is out of range", query.window_end)))?;

    let order = if query.order_by_relevance_desc {
        "relevance DESC, timestamp DESC, id ASC"
    } else {
        "timestamp ASC, id ASC"
    };

    let sql = format!(
        r#"
        SELECT id, source_kind, raw_text, extracted_numbers, keywords,
               sentiment, relevance, timestamp, processing_status
        FROM content_records
        WHERE timestamp >= ? AND timestamp < ? AND processing_status = ?
        ORDER BY {}
        LIMIT ?
        "#,
        order
    );

    let rows = sqlx::query(&sql)
        .bind(&from)
        .bind(&until)
        .bind(query.status.as_str())
        .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Most recent draws strictly before `before`, newest first
pub async fn query_recent_draws(pool: &SqlitePool, before: NaiveDate, count: usize) -> Result<Vec<DrawResult>> {
    let rows = sqlx::query(
        "SELECT draw_date, winning_number FROM draw_results WHERE draw_date < ? ORDER BY draw_date DESC LIMIT ?",
    )
    .bind(before.to_string())
    .bind(i64::try_from(count).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let draw_date: String = row.try_get("draw_date")?;
            let winning_number: String = row.try_get("winning_number")?;
            Ok(DrawResult::new(parse_date(&draw_date)?, winning_number))
        })
        .collect()
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|e| Error::InvalidInput(format!("Invalid record id '{}': {}", id, e)))?;

    let extracted_numbers: String = row.try_get("extracted_numbers")?;
    let extracted_numbers: Vec<String> = serde_json::from_str(&extracted_numbers)
        .map_err(|e| Error::Internal(format!("Failed to deserialize extracted_numbers: {}", e)))?;

    let keywords: String = row.try_get("keywords")?;
    let keywords: Vec<String> = serde_json::from_str(&keywords)
        .map_err(|e| Error::Internal(format!("Failed to deserialize keywords: {}", e)))?;

    let source_kind: String = row.try_get("source_kind")?;
    let processing_status: String = row.try_get("processing_status")?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(Record {
        id,
        source_kind: source_kind.parse()?,
        raw_text: row.try_get("raw_text")?,
        extracted_numbers,
        keywords,
        sentiment: clamp_unit(row.try_get("sentiment")?),
        relevance: clamp_unit(row.try_get("relevance")?),
        timestamp: parse_timestamp(&timestamp)?,
        processing_status: processing_status.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_tables;
    use crate::models::{ProcessingStatus, SourceKind};
    use chrono::{NaiveDate, TimeZone, Utc};
    use lucky_common::db::init_memory_database;

    async fn setup() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        init_tables(&pool).await.unwrap();
        pool
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query(limit: usize) -> RecordQuery {
        RecordQuery {
            window_start: date(2024, 3, 1),
            window_end: date(2024, 3, 15),
            status: ProcessingStatus::Ready,
            order_by_relevance_desc: true,
            limit,
        }
    }

    #[tokio::test]
    async fn test_record_roundtrip_preserves_fields() {
        let pool = setup().await;
        let record = Record::new(SourceKind::Social, "lucky 23", Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap())
            .with_numbers(["23"])
            .with_keywords(["lucky"])
            .with_sentiment(0.8)
            .with_relevance(0.6);
        insert_record(&pool, &record, 100).await.unwrap();

        let loaded = query_records(&pool, &query(10)).await.unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[tokio::test]
    async fn test_window_status_order_and_limit() {
        let pool = setup().await;
        let inside = |day, relevance| {
            Record::new(SourceKind::News, "", Utc.with_ymd_and_hms(2024, 3, day, 23, 59, 0).unwrap())
                .with_relevance(relevance)
        };

        let low = inside(1, 0.2);
        let high = inside(15, 0.9);
        let mid = inside(7, 0.5);
        let pending = inside(7, 1.0).with_status(ProcessingStatus::Pending);
        let before = Record::new(SourceKind::News, "", Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap());
        let draw_day = Record::new(SourceKind::News, "", Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());

        for record in [&low, &high, &mid, &pending, &before, &draw_day] {
            insert_record(&pool, record, 100).await.unwrap();
        }

        let loaded = query_records(&pool, &query(10)).await.unwrap();
        let ids: Vec<Uuid> = loaded.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high.id, mid.id, low.id]);

        let capped = query_records(&pool, &query(2)).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_scores_clamped_on_load() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO content_records (id, source_kind, timestamp, processing_status, sentiment, relevance) \
             VALUES (?, 'news', '2024-03-05T08:00:00.000000Z', 'ready', 1.7, -0.4)",
        )
        .bind(Uuid::new_v4().to_string())
        .execute(&pool)
        .await
        .unwrap();

        let loaded = query_records(&pool, &query(10)).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sentiment, 1.0);
        assert_eq!(loaded[0].relevance, 0.0);
    }

    #[tokio::test]
    async fn test_recent_draws_newest_first() {
        let pool = setup().await;
        insert_draw(&pool, &DrawResult::new(date(2024, 3, 1), "111111"), 100).await.unwrap();
        insert_draw(&pool, &DrawResult::new(date(2024, 3, 16), "222222"), 100).await.unwrap();
        insert_draw(&pool, &DrawResult::new(date(2024, 2, 16), "333333"), 100).await.unwrap();
        // Replaces the earlier result for the same date
        insert_draw(&pool, &DrawResult::new(date(2024, 3, 1), "444444"), 100).await.unwrap();

        let draws = query_recent_draws(&pool, date(2024, 3, 17), 2).await.unwrap();
        assert_eq!(
            draws,
            vec![
                DrawResult::new(date(2024, 3, 16), "222222"),
                DrawResult::new(date(2024, 3, 1), "444444"),
            ]
        );
    }

    #[tokio::test]
    async fn test_recent_draws_exclude_target_date_and_later() {
        let pool = setup().await;
        for (day, number) in [(14, "141414"), (15, "151515"), (16, "161616"), (17, "171717")] {
            insert_draw(&pool, &DrawResult::new(date(2024, 3, day), number), 100).await.unwrap();
        }

        let draws = query_recent_draws(&pool, date(2024, 3, 16), 10).await.unwrap();
        let dates: Vec<NaiveDate> = draws.iter().map(|d| d.draw_date).collect();
        assert_eq!(dates, vec![date(2024, 3, 15), date(2024, 3, 14)]);
    }
}
