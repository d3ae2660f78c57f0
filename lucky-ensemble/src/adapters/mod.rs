//! Scoring adapters
//!
//! Three independent models, each turning the analysis context into a
//! `ModelResult`:
//! 1. Text-Source - weighted number frequency in news/social records
//! 2. Symbolic - dream-symbol dictionary plus folklore/astrology numbers
//! 3. Statistical - hot/cold/pattern/cycle analysis of draw history

pub mod statistical;
pub mod symbolic;
pub mod text_source;

pub use statistical::StatisticalAdapter;
pub use symbolic::{SymbolDictionary, SymbolicAdapter};
pub use text_source::TextSourceAdapter;

use crate::models::NumberCategory;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number string → accumulated score
pub(crate) type ScoreCounter = HashMap<String, f64>;

/// Top `n` numbers of one category, score descending then number ascending
pub(crate) fn rank_top(counter: &ScoreCounter, category: NumberCategory, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = counter
        .iter()
        .filter(|(number, _)| NumberCategory::of(number) == Some(category))
        .map(|(number, score)| (number.clone(), *score))
        .collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(n);
    ranked
}

/// Score of the best entry, used to normalize within a bucket
pub(crate) fn max_score(ranked: &[(String, f64)]) -> f64 {
    ranked.iter().map(|(_, s)| *s).fold(0.0, f64::max)
}

/// Clamp into `0.0..=ceiling`, mapping NaN to 0.0
pub(crate) fn clamp_confidence(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, ceiling)
    }
}
