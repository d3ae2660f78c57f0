//! Text-Source Adapter
//!
//! Scores numbers that recur in news and social records. Each occurrence
//! adds the record's relevance to the number's weighted frequency; the top
//! five numbers per category are kept.
//!
//! Confidence = `(frequency / bucket_max) * 0.8 + historical_factor`, where
//! the historical factor (0.05-0.15) grows the longer the number has been
//! absent from recent draw tails. The sum is clamped to 0.95.

use crate::adapters::{clamp_confidence, max_score, rank_top, ScoreCounter};
use crate::models::{
    AdapterKind, Candidate, DataSummary, DrawResult, ModelResult, NumberCategory, Record,
    MAX_CONFIDENCE,
};
use crate::types::{AdapterError, AnalysisContext, ScoringAdapter};
use rand::RngCore;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Default ensemble weight
pub const TEXT_SOURCE_WEIGHT: f64 = 0.4;

const TOP_PER_CATEGORY: usize = 5;
const FREQUENCY_SCALE: f64 = 0.8;
/// Number of recent draws checked for the historical factor
const RECENCY_WINDOW: usize = 10;
const MIN_HISTORICAL_FACTOR: f64 = 0.05;
const MAX_HISTORICAL_FACTOR: f64 = 0.15;

/// Per-number statistics accumulated from text media records
#[derive(Debug, Clone, Default)]
pub struct TextTally {
    /// Sum of record relevance over every occurrence
    pub weighted_frequency: HashMap<String, f64>,
    /// Distinct records mentioning the number
    pub record_counts: HashMap<String, usize>,
    sentiment_sums: HashMap<String, f64>,
    pub records_analyzed: usize,
    pub numbers_found: usize,
    pub years_discarded: usize,
    pub average_sentiment: f64,
}

impl TextTally {
    /// Mean sentiment of the records mentioning `number`
    pub fn mean_sentiment(&self, number: &str) -> f64 {
        let count = self.record_counts.get(number).copied().unwrap_or(0);
        if count == 0 {
            return 0.5;
        }
        self.sentiment_sums.get(number).copied().unwrap_or(0.0) / count as f64
    }
}

/// News/social frequency model
#[derive(Debug, Clone)]
pub struct TextSourceAdapter {
    weight: f64,
}

impl TextSourceAdapter {
    pub fn new() -> Self {
        Self {
            weight: TEXT_SOURCE_WEIGHT,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Accumulate weighted frequencies over the text media records
    ///
    /// Tokens of 2, 3, 4 or 6 digits are counted; 4-digit calendar years
    /// are discarded. Non text media records are ignored.
    pub fn tally(&self, records: &[Record]) -> TextTally {
        let mut tally = TextTally::default();
        let mut sentiment_total = 0.0;

        for record in records.iter().filter(|r| r.source_kind.is_text_media()) {
            tally.records_analyzed += 1;
            sentiment_total += record.sentiment;

            let mut seen_in_record = HashSet::new();
            for token in record.number_tokens() {
                if !matches!(token.len(), 2 | 3 | 4 | 6) {
                    continue;
                }
                if is_year_like(&token) {
                    tally.years_discarded += 1;
                    continue;
                }

                tally.numbers_found += 1;
                *tally.weighted_frequency.entry(token.clone()).or_insert(0.0) += record.relevance;

                if seen_in_record.insert(token.clone()) {
                    *tally.record_counts.entry(token.clone()).or_insert(0) += 1;
                    *tally.sentiment_sums.entry(token).or_insert(0.0) += record.sentiment;
                }
            }
        }

        if tally.records_analyzed > 0 {
            tally.average_sentiment = sentiment_total / tally.records_analyzed as f64;
        }

        tally
    }
}

impl Default for TextSourceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringAdapter for TextSourceAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::TextSource
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, ctx: &AnalysisContext, _rng: &mut dyn RngCore) -> Result<ModelResult, AdapterError> {
        let tally = self.tally(&ctx.records);

        let mut result = ModelResult::new(
            AdapterKind::TextSource,
            DataSummary::TextSource {
                records_analyzed: tally.records_analyzed,
                numbers_found: tally.numbers_found,
                years_discarded: tally.years_discarded,
                average_sentiment: tally.average_sentiment,
            },
        );

        let counter: &ScoreCounter = &tally.weighted_frequency;
        for category in NumberCategory::ALL {
            let ranked = rank_top(counter, category, TOP_PER_CATEGORY);
            let max = max_score(&ranked);

            for (number, frequency) in ranked {
                let ratio = if max > 0.0 { frequency / max } else { 0.0 };
                let recency = historical_factor(&number, &ctx.draws);
                let confidence = clamp_confidence(ratio * FREQUENCY_SCALE + recency.factor, MAX_CONFIDENCE);
                let reasoning = reasoning_for(&tally, &number, &recency, !ctx.draws.is_empty());

                result
                    .candidates_mut(category)
                    .push(Candidate::new(number, confidence, reasoning));
            }
        }

        debug!(
            records = tally.records_analyzed,
            numbers = tally.numbers_found,
            years_discarded = tally.years_discarded,
            two_digit = result.two_digit.len(),
            three_digit = result.three_digit.len(),
            "Text-source scoring complete"
        );

        Ok(result)
    }
}

/// Recency adjustment for one number
#[derive(Debug, Clone, Copy, PartialEq)]
struct Recency {
    factor: f64,
    /// Draws back to the most recent matching tail, if within the window
    draws_since_seen: Option<usize>,
}

fn historical_factor(number: &str, draws: &[DrawResult]) -> Recency {
    let position = draws
        .iter()
        .take(RECENCY_WINDOW)
        .position(|draw| draw.tail(number.len()) == Some(number));

    match position {
        None => Recency {
            factor: MAX_HISTORICAL_FACTOR,
            draws_since_seen: None,
        },
        Some(index) => Recency {
            factor: MIN_HISTORICAL_FACTOR
                + (MAX_HISTORICAL_FACTOR - MIN_HISTORICAL_FACTOR) * index as f64 / RECENCY_WINDOW as f64,
            draws_since_seen: Some(index),
        },
    }
}

fn is_year_like(token: &str) -> bool {
    token.len() == 4
        && token
            .parse::<u32>()
            .map(|year| (1900..=2099).contains(&year))
            .unwrap_or(false)
}

fn sentiment_label(average: f64) -> &'static str {
    if average > 0.6 {
        "positive"
    } else if average < 0.4 {
        "negative"
    } else {
        "neutral"
    }
}

fn reasoning_for(tally: &TextTally, number: &str, recency: &Recency, has_history: bool) -> String {
    let count = tally.record_counts.get(number).copied().unwrap_or(0);
    let mut reasoning = format!(
        "Mentioned in {} source record{}, {} sentiment",
        count,
        if count == 1 { "" } else { "s" },
        sentiment_label(tally.mean_sentiment(number))
    );

    if has_history && recency.draws_since_seen.is_none() {
        reasoning.push_str(&format!("; not drawn in the last {} draws", RECENCY_WINDOW));
    }

    reasoning
}
