//! Per-adapter scoring output

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Upper bound for any published confidence
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Scoring adapter identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    TextSource,
    Symbolic,
    Statistical,
}

impl AdapterKind {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::TextSource => "text_source",
            AdapterKind::Symbolic => "symbolic",
            AdapterKind::Statistical => "statistical",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output category; every adapter and the combiner produce both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberCategory {
    TwoDigit,
    ThreeDigit,
}

impl NumberCategory {
    pub const ALL: [NumberCategory; 2] = [NumberCategory::TwoDigit, NumberCategory::ThreeDigit];

    /// Digit count of numbers in this category
    pub fn digits(&self) -> usize {
        match self {
            NumberCategory::TwoDigit => 2,
            NumberCategory::ThreeDigit => 3,
        }
    }

    /// Category of a number string, if it is 2 or 3 ASCII digits
    pub fn of(number: &str) -> Option<Self> {
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match number.len() {
            2 => Some(NumberCategory::TwoDigit),
            3 => Some(NumberCategory::ThreeDigit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumberCategory::TwoDigit => "two_digit",
            NumberCategory::ThreeDigit => "three_digit",
        }
    }
}

/// One predicted number with its confidence and rationale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub number: String,
    pub confidence: f64,
    pub reasoning: String,
}

impl Candidate {
    pub fn new(number: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            confidence,
            reasoning: reasoning.into(),
        }
    }

    /// Pair separately indexed lists into candidates
    ///
    /// Ragged input is paired only up to the shorter of `numbers` and
    /// `confidences`; missing reasoning entries become empty strings.
    pub fn zip_lists(numbers: &[String], confidences: &[f64], reasoning: &[String]) -> Vec<Candidate> {
        numbers
            .iter()
            .zip(confidences.iter())
            .enumerate()
            .map(|(i, (number, confidence))| Candidate {
                number: number.clone(),
                confidence: *confidence,
                reasoning: reasoning.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Adapter-specific statistics about the analyzed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSummary {
    TextSource {
        records_analyzed: usize,
        numbers_found: usize,
        years_discarded: usize,
        average_sentiment: f64,
    },
    Symbolic {
        dream_records: usize,
        astrology_records: usize,
        symbols_matched: usize,
        unique_numbers: usize,
    },
    Statistical {
        draws_analyzed: usize,
        hot_numbers: usize,
        cold_numbers: usize,
        pattern_numbers: usize,
        cycle_numbers: usize,
    },
}

/// Result of one scoring adapter invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: AdapterKind,
    pub two_digit: Vec<Candidate>,
    pub three_digit: Vec<Candidate>,
    pub data_summary: DataSummary,
}

impl ModelResult {
    pub fn new(model: AdapterKind, data_summary: DataSummary) -> Self {
        Self {
            model,
            two_digit: Vec::new(),
            three_digit: Vec::new(),
            data_summary,
        }
    }

    pub fn candidates(&self, category: NumberCategory) -> &[Candidate] {
        match category {
            NumberCategory::TwoDigit => &self.two_digit,
            NumberCategory::ThreeDigit => &self.three_digit,
        }
    }

    pub fn candidates_mut(&mut self, category: NumberCategory) -> &mut Vec<Candidate> {
        match category {
            NumberCategory::TwoDigit => &mut self.two_digit,
            NumberCategory::ThreeDigit => &mut self.three_digit,
        }
    }

    pub fn predicted_numbers(&self, category: NumberCategory) -> Vec<&str> {
        self.candidates(category).iter().map(|c| c.number.as_str()).collect()
    }

    pub fn confidence_scores(&self, category: NumberCategory) -> Vec<f64> {
        self.candidates(category).iter().map(|c| c.confidence).collect()
    }

    pub fn reasoning(&self, category: NumberCategory) -> Vec<&str> {
        self.candidates(category).iter().map(|c| c.reasoning.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.two_digit.is_empty() && self.three_digit.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.two_digit.len() + self.three_digit.len()
    }

    /// First number that appears twice within one category, if any
    pub fn find_duplicate(&self) -> Option<(NumberCategory, &str)> {
        for category in NumberCategory::ALL {
            let mut seen = HashSet::new();
            for candidate in self.candidates(category) {
                if !seen.insert(candidate.number.as_str()) {
                    return Some((category, candidate.number.as_str()));
                }
            }
        }
        None
    }
}
