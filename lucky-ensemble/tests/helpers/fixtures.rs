//! Record, draw and adapter fixtures

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use lucky_ensemble::models::{AdapterKind, DrawResult, ModelResult, Record, SourceKind};
use lucky_ensemble::types::{AdapterError, AnalysisContext, ScoringAdapter};
use lucky_ensemble::SqliteStore;
use rand::RngCore;

/// Target draw used across tests
pub fn draw_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
}

/// Insert a mixed set of records inside the collection window of `draw_date()`
///
/// Relevances are distinct so the query order is fully determined.
pub async fn seed_records(store: &SqliteStore) -> usize {
    let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();

    let records = vec![
        Record::new(SourceKind::News, "Jackpot rumours: 23 and 45 trending", at(10, 8))
            .with_numbers(["23", "45"])
            .with_relevance(0.95)
            .with_sentiment(0.8),
        Record::new(SourceKind::Social, "Everyone is betting on 23 and 178 this week", at(12, 9))
            .with_numbers(["23", "178"])
            .with_relevance(0.85)
            .with_sentiment(0.7),
        Record::new(SourceKind::News, "Festival in 2024 draws crowd of 350", at(8, 7))
            .with_relevance(0.75)
            .with_sentiment(0.5),
        Record::new(SourceKind::Dream, "", at(11, 6))
            .with_keywords(["snake", "gold"])
            .with_relevance(0.65),
        Record::new(SourceKind::Dream, "Saw a white elephant near the river", at(13, 5))
            .with_relevance(0.55),
        Record::new(SourceKind::Astrology, "Lucky numbers this week: 9, 27, 319", at(14, 4))
            .with_relevance(0.45),
    ];

    for record in &records {
        store.insert_record(record).await.unwrap();
    }
    records.len()
}

/// Insert `count` daily draws ending the day before `draw_date()`
pub async fn seed_draws(store: &SqliteStore, count: usize) {
    let numbers = [
        "482917", "305561", "771204", "129938", "640275", "883016", "219947", "556380", "094412", "367725",
        "918263", "420589", "731154", "265897", "804430",
    ];

    for i in 0..count {
        let date = draw_date() - Duration::days(i as i64 + 1);
        let number = numbers[i % numbers.len()];
        store.insert_draw(&DrawResult::new(date, number)).await.unwrap();
    }
}

/// Adapter that always fails
pub struct BrokenAdapter(pub AdapterKind);

impl ScoringAdapter for BrokenAdapter {
    fn kind(&self) -> AdapterKind {
        self.0
    }

    fn weight(&self) -> f64 {
        0.3
    }

    fn score(&self, _ctx: &AnalysisContext, _rng: &mut dyn RngCore) -> Result<ModelResult, AdapterError> {
        Err(AdapterError::Internal(format!("{} model offline", self.0)))
    }
}
