//! Symbolic Adapter
//!
//! Maps dream symbols to numbers through a keyword dictionary and blends in
//! the numbers quoted by folklore/astrology records.
//!
//! **Scoring:**
//! - Dream records: +1 per number mapped from each recognized keyword
//! - Astrology records: +relevance per numeric token of at most 3 digits
//! - Combined = 0.7 × dream + 0.3 × astrology
//!
//! Top 5 two-digit and top 3 three-digit numbers are kept with confidence
//! `(combined / bucket_max) * 0.75 + 0.1`, clamped to 0.9.

use crate::adapters::{clamp_confidence, max_score, rank_top, ScoreCounter};
use crate::models::{AdapterKind, Candidate, DataSummary, ModelResult, NumberCategory, Record, SourceKind};
use crate::types::{AdapterError, AnalysisContext, ScoringAdapter};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Default ensemble weight
pub const SYMBOLIC_WEIGHT: f64 = 0.3;

const DREAM_WEIGHT: f64 = 0.7;
const ASTROLOGY_WEIGHT: f64 = 0.3;
const TOP_TWO_DIGIT: usize = 5;
const TOP_THREE_DIGIT: usize = 3;
const CONFIDENCE_SCALE: f64 = 0.75;
const CONFIDENCE_FLOOR: f64 = 0.1;
const CONFIDENCE_CEILING: f64 = 0.9;

const PHRASES: &[&str] = &[
    "Auspicious sign",
    "Strong symbolic resonance",
    "Traditional lucky association",
    "Recurring omen",
    "Favourable portent",
];

/// Built-in dream symbol table (keyword, numbers)
const DEFAULT_SYMBOLS: &[(&str, &[&str])] = &[
    ("snake", &["56", "65", "456"]),
    ("naga", &["56", "65", "567"]),
    ("elephant", &["91", "19", "919"]),
    ("tiger", &["34", "43", "345"]),
    ("dog", &["11", "12"]),
    ("cat", &["16", "61"]),
    ("horse", &["37", "73", "377"]),
    ("fish", &["28", "82"]),
    ("bird", &["23", "32"]),
    ("monk", &["18", "81", "189"]),
    ("gold", &["09", "90", "999"]),
    ("money", &["50", "05", "555"]),
    ("water", &["29", "92"]),
    ("fire", &["04", "40"]),
    ("baby", &["01", "10", "101"]),
    ("house", &["47", "74"]),
    ("car", &["26", "62"]),
    ("ghost", &["07", "70", "707"]),
    ("wedding", &["22", "88", "228"]),
    ("death", &["35", "53"]),
];

/// Dream keyword → numbers table
///
/// Keys are lower-cased on construction and lookups are case-insensitive.
/// Deserializes from a TOML table of `keyword = ["12", "345"]` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Vec<String>>", into = "HashMap<String, Vec<String>>")]
pub struct SymbolDictionary {
    entries: HashMap<String, Vec<String>>,
}

impl SymbolDictionary {
    /// Build from raw entries
    ///
    /// Numbers that are not 2 or 3 ASCII digits are dropped with a warning.
    pub fn new(entries: HashMap<String, Vec<String>>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(keyword, numbers)| {
                let keyword = keyword.trim().to_lowercase();
                let numbers = numbers
                    .into_iter()
                    .filter(|number| {
                        let valid = NumberCategory::of(number).is_some();
                        if !valid {
                            warn!(%keyword, %number, "Dropping symbol number that is not 2 or 3 digits");
                        }
                        valid
                    })
                    .collect();
                (keyword, numbers)
            })
            .collect();
        Self { entries }
    }

    /// Numbers mapped from `keyword`, if known
    pub fn lookup(&self, keyword: &str) -> Option<&[String]> {
        self.entries
            .get(keyword.trim().to_lowercase().as_str())
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SymbolDictionary {
    fn default() -> Self {
        let entries = DEFAULT_SYMBOLS
            .iter()
            .map(|(keyword, numbers)| {
                (
                    keyword.to_string(),
                    numbers.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        Self::new(entries)
    }
}

impl From<HashMap<String, Vec<String>>> for SymbolDictionary {
    fn from(entries: HashMap<String, Vec<String>>) -> Self {
        Self::new(entries)
    }
}

impl From<SymbolDictionary> for HashMap<String, Vec<String>> {
    fn from(dictionary: SymbolDictionary) -> Self {
        dictionary.entries
    }
}

/// Dream/folklore model
#[derive(Debug, Clone)]
pub struct SymbolicAdapter {
    weight: f64,
    dictionary: SymbolDictionary,
}

impl SymbolicAdapter {
    pub fn new(dictionary: SymbolDictionary) -> Self {
        Self {
            weight: SYMBOLIC_WEIGHT,
            dictionary,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Keywords of a dream record; falls back to words of the raw text
    fn dream_keywords(record: &Record) -> Vec<String> {
        if !record.keywords.is_empty() {
            return record.keywords.iter().map(|k| k.trim().to_lowercase()).collect();
        }
        record
            .raw_text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl Default for SymbolicAdapter {
    fn default() -> Self {
        Self::new(SymbolDictionary::default())
    }
}

/// Source tags recorded per number for reasoning
#[derive(Debug, Default)]
struct Provenance {
    symbols: BTreeSet<String>,
    astrology: bool,
}

impl ScoringAdapter for SymbolicAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Symbolic
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, ctx: &AnalysisContext, rng: &mut dyn RngCore) -> Result<ModelResult, AdapterError> {
        let mut dream = ScoreCounter::new();
        let mut astrology = ScoreCounter::new();
        let mut provenance: HashMap<String, Provenance> = HashMap::new();
        let mut dream_records = 0;
        let mut astrology_records = 0;
        let mut symbols_matched = 0;

        for record in &ctx.records {
            match record.source_kind {
                SourceKind::Dream => {
                    dream_records += 1;
                    for keyword in Self::dream_keywords(record) {
                        let Some(numbers) = self.dictionary.lookup(&keyword) else {
                            continue;
                        };
                        symbols_matched += 1;
                        for number in numbers {
                            *dream.entry(number.clone()).or_insert(0.0) += 1.0;
                            provenance
                                .entry(number.clone())
                                .or_default()
                                .symbols
                                .insert(keyword.clone());
                        }
                    }
                }
                SourceKind::Astrology => {
                    astrology_records += 1;
                    for token in record.number_tokens().into_iter().filter(|t| t.len() <= 3) {
                        *astrology.entry(token.clone()).or_insert(0.0) += record.relevance;
                        provenance.entry(token).or_default().astrology = true;
                    }
                }
                SourceKind::News | SourceKind::Social => {}
            }
        }

        let mut combined = ScoreCounter::new();
        for (number, score) in &dream {
            *combined.entry(number.clone()).or_insert(0.0) += DREAM_WEIGHT * score;
        }
        for (number, score) in &astrology {
            *combined.entry(number.clone()).or_insert(0.0) += ASTROLOGY_WEIGHT * score;
        }

        let mut result = ModelResult::new(
            AdapterKind::Symbolic,
            DataSummary::Symbolic {
                dream_records,
                astrology_records,
                symbols_matched,
                unique_numbers: combined.len(),
            },
        );

        for category in NumberCategory::ALL {
            let keep = match category {
                NumberCategory::TwoDigit => TOP_TWO_DIGIT,
                NumberCategory::ThreeDigit => TOP_THREE_DIGIT,
            };
            let ranked = rank_top(&combined, category, keep);
            let max = max_score(&ranked);

            for (number, score) in ranked {
                let ratio = if max > 0.0 { score / max } else { 0.0 };
                let confidence = clamp_confidence(ratio * CONFIDENCE_SCALE + CONFIDENCE_FLOOR, CONFIDENCE_CEILING);
                let phrase = PHRASES.choose(rng).copied().unwrap_or("Symbolic match");
                let reasoning = describe(phrase, provenance.get(&number));

                result
                    .candidates_mut(category)
                    .push(Candidate::new(number, confidence, reasoning));
            }
        }

        debug!(
            dream_records = dream_records,
            astrology_records = astrology_records,
            symbols_matched = symbols_matched,
            candidates = result.candidate_count(),
            "Symbolic scoring complete"
        );

        Ok(result)
    }
}

fn describe(phrase: &str, provenance: Option<&Provenance>) -> String {
    let Some(provenance) = provenance else {
        return phrase.to_string();
    };

    let mut sources = Vec::new();
    if !provenance.symbols.is_empty() {
        let symbols: Vec<&str> = provenance.symbols.iter().map(String::as_str).collect();
        sources.push(format!("dream symbols {}", symbols.join(", ")));
    }
    if provenance.astrology {
        sources.push("folklore/astrology".to_string());
    }

    if sources.is_empty() {
        phrase.to_string()
    } else {
        format!("{} from {}", phrase, sources.join(" and "))
    }
}
