//! Session Manager - Prediction Run Orchestrator
//!
//! Owns the `PredictionSession` state machine and drives one run:
//! 1. Claim the session (COLLECTING_DATA → ANALYZING, conditional in the store)
//! 2. Fetch ready records in the collection window and the recent draws
//! 3. Score with every adapter using a seeded randomness source
//! 4. Combine, persist the prediction, mark the session COMPLETED
//!
//! # Error Handling
//! - Adapter failures follow the configured `FailurePolicy`
//! - Any other failure marks the session FAILED with the reason and is
//!   returned to the caller; failed sessions are never retried in place
//!
//! # Example
//! ```rust,ignore
//! let manager = SessionManager::new(store.clone(), store, settings);
//! let session = manager.create_session(draw_date).await?;
//! let prediction = manager.run(&session).await?;
//! ```

use crate::adapters::{StatisticalAdapter, SymbolicAdapter, TextSourceAdapter};
use crate::combiner::{self, AdapterOutcome};
use crate::config::{EnsembleSettings, FailurePolicy};
use crate::error::{PipelineError, Result};
use crate::models::{EnsemblePrediction, PredictionSession, ProcessingStatus, SessionStatus};
use crate::types::{AnalysisContext, PredictionStore, RecordQuery, RecordSource, ScoringAdapter};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Orchestrates prediction sessions
pub struct SessionManager {
    records: Arc<dyn RecordSource>,
    store: Arc<dyn PredictionStore>,
    adapters: Vec<Box<dyn ScoringAdapter>>,
    settings: EnsembleSettings,
}

impl SessionManager {
    /// Create a manager with the three standard adapters configured from `settings`
    pub fn new(records: Arc<dyn RecordSource>, store: Arc<dyn PredictionStore>, settings: EnsembleSettings) -> Self {
        let adapters: Vec<Box<dyn ScoringAdapter>> = vec![
            Box::new(TextSourceAdapter::new().with_weight(settings.weights.text_source)),
            Box::new(SymbolicAdapter::new(settings.symbols.clone()).with_weight(settings.weights.symbolic)),
            Box::new(StatisticalAdapter::new().with_weight(settings.weights.statistical)),
        ];

        Self {
            records,
            store,
            adapters,
            settings,
        }
    }

    /// Replace the adapter set; they run in the given order
    pub fn with_adapters(mut self, adapters: Vec<Box<dyn ScoringAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Return the active session for `draw_date`, creating one if needed
    ///
    /// Failed sessions are ignored, so a date whose only sessions failed
    /// gets a fresh session.
    pub async fn create_session(&self, draw_date: NaiveDate) -> Result<PredictionSession> {
        if let Some(existing) = self.find_active(draw_date).await? {
            debug!(session_id = %existing.id, %draw_date, status = %existing.status, "Reusing existing session");
            return Ok(existing);
        }

        let session = PredictionSession::new(draw_date, self.settings.window_days);
        let inserted = self
            .store
            .insert_session(&session)
            .await
            .map_err(PipelineError::PersistenceFailure)?;

        if inserted {
            info!(
                session_id = %session.id,
                %draw_date,
                window_start = %session.collection_window.start,
                window_end = %session.collection_window.end,
                "Created prediction session"
            );
            return Ok(session);
        }

        // A concurrent caller created the session first
        self.find_active(draw_date).await?.ok_or_else(|| {
            PipelineError::PersistenceFailure(lucky_common::Error::Internal(format!(
                "Session for {} neither inserted nor found",
                draw_date
            )))
        })
    }

    /// Run a COLLECTING_DATA session to completion
    pub async fn run(&self, session: &PredictionSession) -> Result<EnsemblePrediction> {
        if session.status != SessionStatus::CollectingData {
            return Err(PipelineError::InvalidSessionState {
                session_id: session.id,
                status: session.status,
            });
        }

        let claimed = self
            .store
            .transition_status(session.id, SessionStatus::CollectingData, SessionStatus::Analyzing)
            .await
            .map_err(PipelineError::PersistenceFailure)?;

        if !claimed {
            let current = self
                .store
                .load_session(session.id)
                .await
                .map_err(PipelineError::PersistenceFailure)?
                .ok_or(PipelineError::SessionNotFound(session.id))?;
            warn!(session_id = %session.id, status = %current.status, "Session already claimed by another run");
            return Err(PipelineError::InvalidSessionState {
                session_id: session.id,
                status: current.status,
            });
        }

        let mut session = session.clone();
        if let Err(err) = session.transition_to(SessionStatus::Analyzing) {
            return Err(PipelineError::InvalidSessionState {
                session_id: session.id,
                status: err.from,
            });
        }

        info!(session_id = %session.id, draw_date = %session.for_draw_date, "Prediction run started");

        match self.execute(&mut session).await {
            Ok(prediction) => {
                info!(
                    session_id = %session.id,
                    total_data_points = session.total_data_points,
                    selected = prediction.selected_count(),
                    processing_time = session.processing_time.unwrap_or_default(),
                    overall_confidence = prediction.overall_confidence,
                    "Prediction run completed"
                );
                Ok(prediction)
            }
            Err(err) => {
                self.mark_failed(&mut session, &err).await;
                Err(err)
            }
        }
    }

    /// Create or fetch the session for `draw_date` and run it
    ///
    /// A session that already completed (or was locked) returns its stored
    /// prediction instead of running again.
    pub async fn run_for_draw_date(&self, draw_date: NaiveDate) -> Result<EnsemblePrediction> {
        let session = self.create_session(draw_date).await?;

        if matches!(session.status, SessionStatus::Completed | SessionStatus::Locked) {
            if let Some(prediction) = self.prediction_for_session(session.id).await? {
                debug!(session_id = %session.id, "Returning stored prediction");
                return Ok(prediction);
            }
        }

        self.run(&session).await
    }

    /// Lock all COMPLETED sessions for `draw_date`; returns how many changed
    pub async fn lock(&self, draw_date: NaiveDate) -> Result<u64> {
        let locked = self
            .store
            .lock_completed(draw_date)
            .await
            .map_err(PipelineError::PersistenceFailure)?;

        if locked == 0 {
            debug!(%draw_date, "No completed sessions to lock");
        } else {
            info!(%draw_date, locked, "Locked prediction sessions");
        }
        Ok(locked)
    }

    /// Newest prediction whose session is COMPLETED or LOCKED
    pub async fn latest_completed_prediction(&self) -> Result<Option<EnsemblePrediction>> {
        self.store
            .latest_completed_prediction()
            .await
            .map_err(PipelineError::PersistenceFailure)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<PredictionSession> {
        self.store
            .load_session(id)
            .await
            .map_err(PipelineError::PersistenceFailure)?
            .ok_or(PipelineError::SessionNotFound(id))
    }

    pub async fn prediction_for_session(&self, id: Uuid) -> Result<Option<EnsemblePrediction>> {
        self.store
            .prediction_for_session(id)
            .await
            .map_err(PipelineError::PersistenceFailure)
    }

    async fn find_active(&self, draw_date: NaiveDate) -> Result<Option<PredictionSession>> {
        self.store
            .find_active_session(draw_date)
            .await
            .map_err(PipelineError::PersistenceFailure)
    }

    /// Steps after the claim; `session` is ANALYZING on entry
    async fn execute(&self, session: &mut PredictionSession) -> Result<EnsemblePrediction> {
        self.store
            .update_session(session)
            .await
            .map_err(PipelineError::PersistenceFailure)?;

        let query = RecordQuery {
            window_start: session.collection_window.start,
            window_end: session.collection_window.end,
            status: ProcessingStatus::Ready,
            order_by_relevance_desc: true,
            limit: self.settings.record_limit,
        };
        let records = self
            .records
            .query_records(&query)
            .await
            .map_err(PipelineError::RecordSource)?;
        let draws = self
            .records
            .query_recent_draws(session.for_draw_date, self.settings.history_depth)
            .await
            .map_err(PipelineError::RecordSource)?;

        if records.is_empty() {
            warn!(
                session_id = %session.id,
                window_start = %query.window_start,
                window_end = %query.window_end,
                "No records in collection window; continuing with draw history only"
            );
        }
        debug!(session_id = %session.id, records = records.len(), draws = draws.len(), "Analysis input loaded");

        let total_data_points = records.len();
        let ctx = AnalysisContext::new(records, draws);
        let outcomes = self.score_all(session, &ctx)?;
        let combined = combiner::combine(&outcomes)?;

        let prediction = EnsemblePrediction::from_combined(session, combined, total_data_points);
        self.store
            .save_prediction(&prediction)
            .await
            .map_err(PipelineError::PersistenceFailure)?;

        let mut completed = session.clone();
        if let Err(err) = completed.complete(total_data_points) {
            return Err(PipelineError::InvalidSessionState {
                session_id: session.id,
                status: err.from,
            });
        }
        self.store
            .update_session(&completed)
            .await
            .map_err(PipelineError::PersistenceFailure)?;
        *session = completed;

        Ok(prediction)
    }

    fn score_all(&self, session: &PredictionSession, ctx: &AnalysisContext) -> Result<Vec<AdapterOutcome>> {
        let seed = self.settings.seed_for(session.for_draw_date);
        let mut rng = StdRng::seed_from_u64(seed);
        debug!(session_id = %session.id, seed, "Seeded randomness source");

        let mut outcomes = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            match adapter.score(ctx, &mut rng) {
                Ok(result) => {
                    debug!(
                        session_id = %session.id,
                        adapter = adapter.name(),
                        candidates = result.candidate_count(),
                        "Adapter scored"
                    );
                    outcomes.push(AdapterOutcome::Available {
                        result,
                        weight: adapter.weight(),
                    });
                }
                Err(err) => match self.settings.failure_policy {
                    FailurePolicy::FailAll => {
                        error!(session_id = %session.id, adapter = adapter.name(), error = %err, "Adapter failed");
                        return Err(PipelineError::AdapterFailure {
                            adapter: adapter.kind(),
                            source: err,
                        });
                    }
                    FailurePolicy::FailOpen => {
                        warn!(
                            session_id = %session.id,
                            adapter = adapter.name(),
                            error = %err,
                            "Adapter failed; continuing without it"
                        );
                        outcomes.push(AdapterOutcome::Unavailable {
                            adapter: adapter.kind(),
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }

        Ok(outcomes)
    }

    async fn mark_failed(&self, session: &mut PredictionSession, err: &PipelineError) {
        let reason = err.to_string();
        error!(session_id = %session.id, error = %reason, "Prediction run failed");

        if session.fail(reason).is_err() {
            return;
        }
        if let Err(store_err) = self.store.update_session(session).await {
            error!(
                session_id = %session.id,
                error = %store_err,
                "Failed to record session failure"
            );
        }
    }
}
