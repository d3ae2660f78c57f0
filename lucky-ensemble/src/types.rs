//! Core Types and Trait Definitions
//!
//! Defines the seams of the prediction pipeline:
//! - **ScoringAdapter:** turns an analysis context into a `ModelResult`
//! - **RecordSource:** supplies content records and draw history
//! - **PredictionStore:** persists sessions and predictions
//!
//! Adapters are synchronous and pure apart from the injected randomness
//! source. The record source and store are async because the bundled
//! implementation is SQLite-backed.

use crate::models::{
    AdapterKind, DrawResult, EnsemblePrediction, ModelResult, PredictionSession, ProcessingStatus,
    Record, SessionStatus,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Scoring Adapters
// ============================================================================

/// Everything an adapter may read for one session
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Records in the collection window, relevance descending
    pub records: Vec<Record>,
    /// Recent draw results, newest first
    pub draws: Vec<DrawResult>,
}

impl AnalysisContext {
    pub fn new(records: Vec<Record>, draws: Vec<DrawResult>) -> Self {
        Self { records, draws }
    }
}

/// Scoring model producing candidate numbers
///
/// Implementations must not repeat a number within one category and must
/// keep confidences inside 0.0-0.95. Any randomness must come from `rng`
/// so that a seeded run is reproducible.
pub trait ScoringAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Ensemble weight applied by the combiner
    fn weight(&self) -> f64;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn score(&self, ctx: &AnalysisContext, rng: &mut dyn RngCore) -> Result<ModelResult, AdapterError>;
}

/// Failure inside one scoring adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Input data the adapter cannot interpret
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// External collaborators
// ============================================================================

/// Query for records in a collection window
#[derive(Debug, Clone)]
pub struct RecordQuery {
    pub window_start: NaiveDate,
    /// Inclusive
    pub window_end: NaiveDate,
    pub status: ProcessingStatus,
    pub order_by_relevance_desc: bool,
    pub limit: usize,
}

/// Supplier of content records and draw history
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn query_records(&self, query: &RecordQuery) -> lucky_common::Result<Vec<Record>>;

    /// Most recent draws strictly before `before`, newest first
    async fn query_recent_draws(&self, before: NaiveDate, count: usize) -> lucky_common::Result<Vec<DrawResult>>;
}

/// Persistence for sessions and predictions
///
/// All writes are whole-object upserts.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Insert a new session
    ///
    /// Returns false, leaving storage untouched, when a non-FAILED session
    /// for the same draw date already exists.
    async fn insert_session(&self, session: &PredictionSession) -> lucky_common::Result<bool>;

    async fn update_session(&self, session: &PredictionSession) -> lucky_common::Result<()>;

    async fn load_session(&self, id: Uuid) -> lucky_common::Result<Option<PredictionSession>>;

    /// Newest session for `date` that is not FAILED
    async fn find_active_session(&self, date: NaiveDate) -> lucky_common::Result<Option<PredictionSession>>;

    /// Atomically move a session from `from` to `to`
    ///
    /// Returns false when the stored status was not `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> lucky_common::Result<bool>;

    /// Move every COMPLETED session for `date` to LOCKED; returns the count
    async fn lock_completed(&self, date: NaiveDate) -> lucky_common::Result<u64>;

    async fn save_prediction(&self, prediction: &EnsemblePrediction) -> lucky_common::Result<()>;

    async fn prediction_for_session(&self, session_id: Uuid) -> lucky_common::Result<Option<EnsemblePrediction>>;

    /// Newest prediction whose session is COMPLETED or LOCKED
    async fn latest_completed_prediction(&self) -> lucky_common::Result<Option<EnsemblePrediction>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::InvalidInput("draw '12a' is not numeric".to_string());
        assert_eq!(err.to_string(), "Invalid input: draw '12a' is not numeric");
    }
}
