//! Statistical Adapter
//!
//! Analyzes the recent draw history (newest first) for four signals:
//! - **Hot:** substrings that keep appearing in the last 10 draws
//! - **Cold:** 2/3-digit numbers absent from the last 15 draws (sampled)
//! - **Pattern:** extrapolated tail digit plus tail pairs with a typical digit sum
//! - **Cycle:** tails recurring at periods 3, 5 and 7
//!
//! Memberships are weighted (hot 3, pattern 2, cycle 2, cold 1.5) and the
//! top 5 two-digit numbers are published. Three-digit picks are the top
//! three two-digit picks with a leading `0`.

use crate::adapters::{rank_top, ScoreCounter};
use crate::models::{AdapterKind, Candidate, DataSummary, DrawResult, ModelResult, NumberCategory};
use crate::types::{AdapterError, AnalysisContext, ScoringAdapter};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Default ensemble weight
pub const STATISTICAL_WEIGHT: f64 = 0.3;

const HOT_WINDOW: usize = 10;
const HOT_KEEP: usize = 10;
const COLD_WINDOW: usize = 15;
const COLD_SAMPLE: usize = 5;
const PATTERN_WINDOW: usize = 3;
const DIGIT_SUM_WINDOW: usize = 10;
const CYCLE_PERIODS: [usize; 3] = [3, 5, 7];

const HOT_WEIGHT: f64 = 3.0;
const PATTERN_WEIGHT: f64 = 2.0;
const CYCLE_WEIGHT: f64 = 2.0;
const COLD_WEIGHT: f64 = 1.5;

const TOP_TWO_DIGIT: usize = 5;
const DERIVED_THREE_DIGIT: usize = 3;
const RANK_START: f64 = 0.8;
const RANK_STEP: f64 = 0.1;
const RANK_FLOOR: f64 = 0.5;

/// Candidate sets derived from the draw history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySignals {
    pub hot: Vec<String>,
    pub cold: Vec<String>,
    pub pattern: BTreeSet<String>,
    pub cycle: BTreeSet<String>,
}

/// Draw-history model
#[derive(Debug, Clone)]
pub struct StatisticalAdapter {
    weight: f64,
}

impl StatisticalAdapter {
    pub fn new() -> Self {
        Self {
            weight: STATISTICAL_WEIGHT,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Compute the four candidate sets; `draws` must be newest first
    pub fn signals(&self, draws: &[DrawResult], rng: &mut dyn RngCore) -> HistorySignals {
        HistorySignals {
            hot: hot_numbers(draws),
            cold: cold_numbers(draws, rng),
            pattern: pattern_numbers(draws),
            cycle: cycle_numbers(draws),
        }
    }
}

impl Default for StatisticalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringAdapter for StatisticalAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Statistical
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, ctx: &AnalysisContext, rng: &mut dyn RngCore) -> Result<ModelResult, AdapterError> {
        if let Some(bad) = ctx
            .draws
            .iter()
            .find(|d| d.winning_number.is_empty() || !d.winning_number.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(AdapterError::InvalidInput(format!(
                "draw {} has non-numeric winning number '{}'",
                bad.draw_date, bad.winning_number
            )));
        }

        let signals = self.signals(&ctx.draws, rng);

        let mut result = ModelResult::new(
            AdapterKind::Statistical,
            DataSummary::Statistical {
                draws_analyzed: ctx.draws.len(),
                hot_numbers: signals.hot.len(),
                cold_numbers: signals.cold.len(),
                pattern_numbers: signals.pattern.len(),
                cycle_numbers: signals.cycle.len(),
            },
        );

        if ctx.draws.is_empty() {
            debug!("No draw history; statistical adapter returns no candidates");
            return Ok(result);
        }

        let mut counter = ScoreCounter::new();
        add_membership(&mut counter, signals.hot.iter(), HOT_WEIGHT);
        add_membership(&mut counter, signals.pattern.iter(), PATTERN_WEIGHT);
        add_membership(&mut counter, signals.cycle.iter(), CYCLE_WEIGHT);
        add_membership(&mut counter, signals.cold.iter(), COLD_WEIGHT);

        let ranked = rank_top(&counter, NumberCategory::TwoDigit, TOP_TWO_DIGIT);
        for (rank, (number, _)) in ranked.iter().enumerate() {
            let confidence = rank_confidence(rank);
            result.two_digit.push(Candidate::new(
                number.clone(),
                confidence,
                format!("Statistical signals: {}", signal_names(&signals, number).join(", ")),
            ));
        }

        // Three-digit picks mirror the leading two-digit picks with a "0" prefix
        let derived: Vec<Candidate> = result
            .two_digit
            .iter()
            .take(DERIVED_THREE_DIGIT)
            .map(|c| {
                Candidate::new(
                    format!("0{}", c.number),
                    c.confidence,
                    format!("Derived from two-digit pick {}", c.number),
                )
            })
            .collect();
        result.three_digit = derived;

        debug!(
            draws = ctx.draws.len(),
            hot = signals.hot.len(),
            cold = signals.cold.len(),
            pattern = signals.pattern.len(),
            cycle = signals.cycle.len(),
            "Statistical scoring complete"
        );

        Ok(result)
    }
}

fn add_membership<'a>(counter: &mut ScoreCounter, members: impl Iterator<Item = &'a String>, weight: f64) {
    for number in members {
        *counter.entry(number.clone()).or_insert(0.0) += weight;
    }
}

fn rank_confidence(rank: usize) -> f64 {
    (RANK_START - RANK_STEP * rank as f64).max(RANK_FLOOR)
}

fn signal_names(signals: &HistorySignals, number: &str) -> Vec<&'static str> {
    let mut names = Vec::new();
    if signals.hot.iter().any(|n| n == number) {
        names.push("hot");
    }
    if signals.pattern.contains(number) {
        names.push("pattern");
    }
    if signals.cycle.contains(number) {
        names.push("cycle");
    }
    if signals.cold.iter().any(|n| n == number) {
        names.push("cold");
    }
    names
}

/// Top substrings of the last 10 draws; tails count double
fn hot_numbers(draws: &[DrawResult]) -> Vec<String> {
    let mut counter = ScoreCounter::new();

    for draw in draws.iter().take(HOT_WINDOW) {
        let pairs = draw.substrings(2);
        if let Some((tail, rest)) = pairs.split_last() {
            *counter.entry(tail.to_string()).or_insert(0.0) += 2.0;
            for pair in rest {
                *counter.entry(pair.to_string()).or_insert(0.0) += 1.0;
            }
        }
        if let Some(tail) = draw.tail(3) {
            *counter.entry(tail.to_string()).or_insert(0.0) += 2.0;
        }
    }

    let mut ranked: Vec<(String, f64)> = counter.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.into_iter().take(HOT_KEEP).map(|(n, _)| n).collect()
}

/// Up to 5 two-digit and 5 three-digit numbers absent from the last 15 draws
fn cold_numbers(draws: &[DrawResult], rng: &mut dyn RngCore) -> Vec<String> {
    if draws.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for draw in draws.iter().take(COLD_WINDOW) {
        seen.extend(draw.substrings(2));
        seen.extend(draw.substrings(3));
    }

    let absent_two: Vec<String> = (0..100)
        .map(|n| format!("{:02}", n))
        .filter(|n| !seen.contains(n.as_str()))
        .collect();
    let absent_three: Vec<String> = (0..1000)
        .map(|n| format!("{:03}", n))
        .filter(|n| !seen.contains(n.as_str()))
        .collect();

    let mut cold: Vec<String> = absent_two.choose_multiple(rng, COLD_SAMPLE).cloned().collect();
    cold.extend(absent_three.choose_multiple(rng, COLD_SAMPLE).cloned());
    cold
}

/// Extrapolated tail plus recent tails with a typical digit sum
fn pattern_numbers(draws: &[DrawResult]) -> BTreeSet<String> {
    let mut pattern = BTreeSet::new();

    let recent: Vec<&DrawResult> = draws.iter().take(PATTERN_WINDOW).collect();
    let last_digits: Vec<i32> = recent
        .iter()
        .filter_map(|d| d.last_digit())
        .map(|d| d as i32)
        .collect();

    if last_digits.len() >= 2 {
        let diffs: Vec<i32> = last_digits.windows(2).map(|w| w[0] - w[1]).collect();
        let mean = diffs.iter().sum::<i32>() as f64 / diffs.len() as f64;
        let next = (last_digits[0] + mean.round() as i32).rem_euclid(10);
        if let Some(tens) = draws.first().and_then(|d| d.tail(2)).and_then(|t| t.chars().next()) {
            pattern.insert(format!("{}{}", tens, next));
        }
    }

    let recent_sums: Vec<u32> = recent.iter().filter_map(|d| d.tail(2)).map(digit_sum).collect();
    if !recent_sums.is_empty() {
        let mean_sum = recent_sums.iter().sum::<u32>() as f64 / recent_sums.len() as f64;
        for tail in draws.iter().take(DIGIT_SUM_WINDOW).filter_map(|d| d.tail(2)) {
            if (digit_sum(tail) as f64 - mean_sum).abs() <= 1.0 {
                pattern.insert(tail.to_string());
            }
        }
    }

    pattern
}

/// Tails found exactly p, 2p, 3p ... draws back for each period
fn cycle_numbers(draws: &[DrawResult]) -> BTreeSet<String> {
    let mut cycle = BTreeSet::new();
    for period in CYCLE_PERIODS {
        for draw in draws.iter().skip(period - 1).step_by(period) {
            if let Some(tail) = draw.tail(2) {
                cycle.insert(tail.to_string());
            }
        }
    }
    cycle
}

fn digit_sum(number: &str) -> u32 {
    number.chars().filter_map(|c| c.to_digit(10)).sum()
}
