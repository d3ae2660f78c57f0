//! Final ensemble output

use crate::models::{NumberCategory, PredictionSession};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One selected number in the published prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNumber {
    pub number: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Combiner output before it is bound to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedPrediction {
    pub final_two_digit: Vec<ScoredNumber>,
    pub final_three_digit: Vec<ScoredNumber>,
    /// Overall confidence (0.0-0.95)
    pub overall_confidence: f64,
    pub prediction_summary: String,
    /// Model name → contribution summary
    pub model_contributions: BTreeMap<String, String>,
}

/// Published prediction for one completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    pub id: Uuid,
    pub session_ref: Uuid,
    pub for_draw_date: NaiveDate,
    pub final_two_digit: Vec<ScoredNumber>,
    pub final_three_digit: Vec<ScoredNumber>,
    pub overall_confidence: f64,
    pub prediction_summary: String,
    pub model_contributions: BTreeMap<String, String>,
    pub total_data_points: usize,
    pub created_at: DateTime<Utc>,
}

impl EnsemblePrediction {
    /// Bind combiner output to the session that produced it
    pub fn from_combined(
        session: &PredictionSession,
        combined: CombinedPrediction,
        total_data_points: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_ref: session.id,
            for_draw_date: session.for_draw_date,
            final_two_digit: combined.final_two_digit,
            final_three_digit: combined.final_three_digit,
            overall_confidence: combined.overall_confidence,
            prediction_summary: combined.prediction_summary,
            model_contributions: combined.model_contributions,
            total_data_points,
            created_at: Utc::now(),
        }
    }

    pub fn numbers(&self, category: NumberCategory) -> &[ScoredNumber] {
        match category {
            NumberCategory::TwoDigit => &self.final_two_digit,
            NumberCategory::ThreeDigit => &self.final_three_digit,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.final_two_digit.len() + self.final_three_digit.len()
    }
}
