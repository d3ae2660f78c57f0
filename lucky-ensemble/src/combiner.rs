//! Ensemble Combiner - Confidence-Weighted Fusion
//!
//! Merges per-adapter results into one prediction. For every number the
//! combiner sums `confidence * adapter_weight` over the adapters that
//! proposed it, then keeps the top 3 two-digit and top 2 three-digit numbers.
//!
//! Overall confidence = mean of the selected confidences, +0.05 when at
//! least four numbers were selected, clamped to 0.95 (0.75 when nothing was
//! selected).

use crate::models::{AdapterKind, CombinedPrediction, ModelResult, NumberCategory, ScoredNumber, MAX_CONFIDENCE};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

const TOP_TWO_DIGIT: usize = 3;
const TOP_THREE_DIGIT: usize = 2;
const REASONING_SEPARATOR: &str = " | ";
const MAX_REASONING_CHARS: usize = 200;
/// Reported when no number was selected
const EMPTY_SELECTION_CONFIDENCE: f64 = 0.75;
const BREADTH_BONUS: f64 = 0.05;
const BREADTH_BONUS_MIN_SELECTED: usize = 4;

/// What one adapter contributed to a run
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Available { result: ModelResult, weight: f64 },
    /// Adapter failed and was skipped under the fail-open policy
    Unavailable { adapter: AdapterKind, reason: String },
}

impl AdapterOutcome {
    pub fn adapter(&self) -> AdapterKind {
        match self {
            AdapterOutcome::Available { result, .. } => result.model,
            AdapterOutcome::Unavailable { adapter, .. } => *adapter,
        }
    }
}

/// Reasons the combiner refuses its input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombinerError {
    #[error("No adapter outcomes to combine")]
    NoOutcomes,

    #[error("All {0} adapters were unavailable")]
    AllUnavailable(usize),

    #[error("Adapter {adapter} reported invalid confidence {confidence} for {number}")]
    InvalidConfidence {
        adapter: AdapterKind,
        number: String,
        confidence: f64,
    },

    #[error("Adapter {adapter} has invalid weight {weight}")]
    InvalidWeight { adapter: AdapterKind, weight: f64 },

    #[error("Adapter {adapter} proposed '{number}' which is not a {category} number")]
    InvalidNumber {
        adapter: AdapterKind,
        category: &'static str,
        number: String,
    },

    #[error("Adapter {adapter} proposed {number} twice in {category}")]
    DuplicateNumber {
        adapter: AdapterKind,
        category: &'static str,
        number: String,
    },
}

/// Accumulated evidence for one number
#[derive(Debug, Default)]
struct Tally {
    score: f64,
    log: Vec<String>,
}

/// Combine adapter outcomes into a single prediction
pub fn combine(outcomes: &[AdapterOutcome]) -> Result<CombinedPrediction, CombinerError> {
    if outcomes.is_empty() {
        return Err(CombinerError::NoOutcomes);
    }

    let available: Vec<(&ModelResult, f64)> = outcomes
        .iter()
        .filter_map(|o| match o {
            AdapterOutcome::Available { result, weight } => Some((result, *weight)),
            AdapterOutcome::Unavailable { .. } => None,
        })
        .collect();

    if available.is_empty() {
        return Err(CombinerError::AllUnavailable(outcomes.len()));
    }

    for (result, weight) in &available {
        validate(result, *weight)?;
    }

    debug!(
        available = available.len(),
        unavailable = outcomes.len() - available.len(),
        "Combining adapter results"
    );

    let final_two_digit = select(&available, NumberCategory::TwoDigit, TOP_TWO_DIGIT);
    let final_three_digit = select(&available, NumberCategory::ThreeDigit, TOP_THREE_DIGIT);

    let overall_confidence = overall_confidence(&final_two_digit, &final_three_digit);
    let prediction_summary = summarize(&final_two_digit, &final_three_digit, &available);
    let model_contributions = contributions(outcomes);

    info!(
        two_digit = final_two_digit.len(),
        three_digit = final_three_digit.len(),
        overall_confidence = overall_confidence,
        "Ensemble prediction combined"
    );

    Ok(CombinedPrediction {
        final_two_digit,
        final_three_digit,
        overall_confidence,
        prediction_summary,
        model_contributions,
    })
}

fn validate(result: &ModelResult, weight: f64) -> Result<(), CombinerError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(CombinerError::InvalidWeight {
            adapter: result.model,
            weight,
        });
    }

    if let Some((category, number)) = result.find_duplicate() {
        return Err(CombinerError::DuplicateNumber {
            adapter: result.model,
            category: category.as_str(),
            number: number.to_string(),
        });
    }

    for category in NumberCategory::ALL {
        for candidate in result.candidates(category) {
            if NumberCategory::of(&candidate.number) != Some(category) {
                return Err(CombinerError::InvalidNumber {
                    adapter: result.model,
                    category: category.as_str(),
                    number: candidate.number.clone(),
                });
            }

            let c = candidate.confidence;
            if !c.is_finite() || !(0.0..=MAX_CONFIDENCE).contains(&c) {
                return Err(CombinerError::InvalidConfidence {
                    adapter: result.model,
                    number: candidate.number.clone(),
                    confidence: c,
                });
            }
        }
    }

    Ok(())
}

fn select(available: &[(&ModelResult, f64)], category: NumberCategory, keep: usize) -> Vec<ScoredNumber> {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for (result, weight) in available {
        for candidate in result.candidates(category) {
            let tally = tallies.entry(candidate.number.as_str()).or_default();
            tally.score += candidate.confidence * weight;
            tally.log.push(format!("{}: {}", result.model.name(), candidate.reasoning));
        }
    }

    let mut ranked: Vec<(&str, Tally)> = tallies.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(keep)
        .map(|(number, tally)| ScoredNumber {
            number: number.to_string(),
            confidence: tally.score.clamp(0.0, MAX_CONFIDENCE),
            reasoning: truncate_chars(&tally.log.join(REASONING_SEPARATOR), MAX_REASONING_CHARS),
        })
        .collect()
}

fn overall_confidence(two_digit: &[ScoredNumber], three_digit: &[ScoredNumber]) -> f64 {
    let selected: Vec<f64> = two_digit
        .iter()
        .chain(three_digit.iter())
        .map(|n| n.confidence)
        .collect();

    if selected.is_empty() {
        return EMPTY_SELECTION_CONFIDENCE;
    }

    let mut overall = selected.iter().sum::<f64>() / selected.len() as f64;
    if selected.len() >= BREADTH_BONUS_MIN_SELECTED {
        overall += BREADTH_BONUS;
    }
    overall.clamp(0.0, MAX_CONFIDENCE)
}

fn summarize(two_digit: &[ScoredNumber], three_digit: &[ScoredNumber], available: &[(&ModelResult, f64)]) -> String {
    let models: Vec<&str> = available.iter().map(|(r, _)| r.model.name()).collect();

    if two_digit.is_empty() && three_digit.is_empty() {
        return format!("No numbers selected from models: {}", models.join(", "));
    }

    let picks = |numbers: &[ScoredNumber]| -> String {
        if numbers.is_empty() {
            return "none".to_string();
        }
        numbers
            .iter()
            .map(|n| format!("{} ({:.2})", n.number, n.confidence))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Top two-digit: {}; top three-digit: {}; models: {}",
        picks(two_digit),
        picks(three_digit),
        models.join(", ")
    )
}

fn contributions(outcomes: &[AdapterOutcome]) -> BTreeMap<String, String> {
    outcomes
        .iter()
        .map(|outcome| {
            let summary = match outcome {
                AdapterOutcome::Available { result, weight } => format!(
                    "{} two-digit, {} three-digit candidates (weight {:.2})",
                    result.two_digit.len(),
                    result.three_digit.len(),
                    weight
                ),
                AdapterOutcome::Unavailable { reason, .. } => format!("unavailable: {}", reason),
            };
            (outcome.adapter().name().to_string(), summary)
        })
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, DataSummary};

    fn result(model: AdapterKind, two: &[(&str, f64)], three: &[(&str, f64)]) -> ModelResult {
        let summary = DataSummary::Statistical {
            draws_analyzed: 0,
            hot_numbers: 0,
            cold_numbers: 0,
            pattern_numbers: 0,
            cycle_numbers: 0,
        };
        let mut r = ModelResult::new(model, summary);
        r.two_digit = two.iter().map(|(n, c)| Candidate::new(*n, *c, "why")).collect();
        r.three_digit = three.iter().map(|(n, c)| Candidate::new(*n, *c, "why")).collect();
        r
    }

    fn available(result: ModelResult, weight: f64) -> AdapterOutcome {
        AdapterOutcome::Available { result, weight }
    }

    #[test]
    fn test_weighted_sum_across_adapters() {
        let outcomes = vec![
            available(result(AdapterKind::TextSource, &[("23", 0.8)], &[]), 0.4),
            available(result(AdapterKind::Symbolic, &[("23", 0.6)], &[]), 0.3),
            available(result(AdapterKind::Statistical, &[("23", 0.5)], &[]), 0.3),
        ];

        let combined = combine(&outcomes).unwrap();
        assert_eq!(combined.final_two_digit.len(), 1);
        let top = &combined.final_two_digit[0];
        assert_eq!(top.number, "23");
        assert!((top.confidence - 0.65).abs() < 1e-9);
        assert!(top.reasoning.starts_with("text_source: why | symbolic: why"));
        assert!((combined.overall_confidence - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_selection_limits_and_tie_break() {
        let outcomes = vec![available(
            result(
                AdapterKind::TextSource,
                &[("45", 0.5), ("12", 0.5), ("99", 0.9), ("30", 0.1)],
                &[("300", 0.2), ("100", 0.2), ("999", 0.1)],
            ),
            1.0,
        )];

        let combined = combine(&outcomes).unwrap();
        let two: Vec<&str> = combined.final_two_digit.iter().map(|n| n.number.as_str()).collect();
        let three: Vec<&str> = combined.final_three_digit.iter().map(|n| n.number.as_str()).collect();
        assert_eq!(two, vec!["99", "12", "45"]);
        assert_eq!(three, vec!["100", "300"]);

        // 5 selected: mean (0.9 + 0.5 + 0.5 + 0.2 + 0.2) / 5 = 0.46, plus breadth bonus
        assert!((combined.overall_confidence - 0.51).abs() < 1e-9);
    }

    #[test]
    fn test_empty_selection_confidence() {
        let outcomes = vec![available(result(AdapterKind::Statistical, &[], &[]), 0.3)];
        let combined = combine(&outcomes).unwrap();
        assert!(combined.final_two_digit.is_empty());
        assert_eq!(combined.overall_confidence, 0.75);
        assert!(combined.prediction_summary.starts_with("No numbers selected"));
    }

    #[test]
    fn test_scores_clamped() {
        let outcomes = vec![available(result(AdapterKind::TextSource, &[("23", 0.95)], &[]), 2.0)];
        let combined = combine(&outcomes).unwrap();
        assert_eq!(combined.final_two_digit[0].confidence, 0.95);
        assert_eq!(combined.overall_confidence, 0.95);
    }

    #[test]
    fn test_rejects_no_outcomes_and_all_unavailable() {
        assert_eq!(combine(&[]), Err(CombinerError::NoOutcomes));

        let outcomes = vec![AdapterOutcome::Unavailable {
            adapter: AdapterKind::Symbolic,
            reason: "boom".to_string(),
        }];
        assert_eq!(combine(&outcomes), Err(CombinerError::AllUnavailable(1)));
    }

    #[test]
    fn test_rejects_bad_confidence() {
        for bad in [f64::NAN, 1.2, -0.1] {
            let outcomes = vec![available(result(AdapterKind::TextSource, &[("23", bad)], &[]), 0.4)];
            assert!(matches!(
                combine(&outcomes),
                Err(CombinerError::InvalidConfidence { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_duplicates() {
        let outcomes = vec![available(
            result(AdapterKind::Symbolic, &[], &[("123", 0.5), ("123", 0.4)]),
            0.3,
        )];
        match combine(&outcomes) {
            Err(CombinerError::DuplicateNumber { number, category, .. }) => {
                assert_eq!(number, "123");
                assert_eq!(category, "three_digit");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        for (two, three) in [(vec![("ab", 0.5)], vec![]), (vec![("é", 0.5)], vec![]), (vec![], vec![("12", 0.5)])] {
            let outcomes = vec![available(result(AdapterKind::Symbolic, &two, &three), 0.3)];
            assert!(matches!(
                combine(&outcomes),
                Err(CombinerError::InvalidNumber {
                    adapter: AdapterKind::Symbolic,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_unavailable_adapter_reported_in_contributions() {
        let outcomes = vec![
            available(result(AdapterKind::TextSource, &[("23", 0.8)], &[]), 0.4),
            AdapterOutcome::Unavailable {
                adapter: AdapterKind::Statistical,
                reason: "Invalid input: draw is not numeric".to_string(),
            },
        ];

        let combined = combine(&outcomes).unwrap();
        assert_eq!(
            combined.model_contributions["text_source"],
            "1 two-digit, 0 three-digit candidates (weight 0.40)"
        );
        assert!(combined.model_contributions["statistical"].starts_with("unavailable:"));
        assert!(combined.prediction_summary.contains("models: text_source"));
    }

    #[test]
    fn test_reasoning_truncated_on_char_boundary() {
        let long = "ดวง".repeat(200);
        let mut r = result(AdapterKind::Symbolic, &[], &[]);
        r.two_digit.push(Candidate::new("07", 0.5, long));

        let combined = combine(&[available(r, 0.3)]).unwrap();
        assert_eq!(combined.final_two_digit[0].reasoning.chars().count(), 200);
    }
}
