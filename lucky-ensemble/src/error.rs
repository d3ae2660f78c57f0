//! Error types for lucky-ensemble
//!
//! `PipelineError` is what the session manager reports to callers. An empty
//! collection window is not an error; the run continues with a warning.

use crate::combiner::CombinerError;
use crate::models::{AdapterKind, SessionStatus};
use crate::types::AdapterError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Prediction pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Records or draw history could not be fetched
    #[error("Record source error: {0}")]
    RecordSource(#[source] lucky_common::Error),

    /// A scoring adapter failed under the fail-all policy
    #[error("Adapter {adapter} failed: {source}")]
    AdapterFailure {
        adapter: AdapterKind,
        #[source]
        source: AdapterError,
    },

    /// The combiner rejected the adapter outcomes
    #[error("Combiner failure: {0}")]
    CombinerFailure(String),

    /// Session or prediction could not be persisted
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[source] lucky_common::Error),

    /// Operation not allowed in the session's current status
    #[error("Session {session_id} cannot run from status {status}")]
    InvalidSessionState { session_id: Uuid, status: SessionStatus },

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

impl From<CombinerError> for PipelineError {
    fn from(err: CombinerError) -> Self {
        PipelineError::CombinerFailure(err.to_string())
    }
}
