//! Data models for the prediction pipeline

pub mod model_result;
pub mod prediction;
pub mod record;
pub mod session;

pub use model_result::{AdapterKind, Candidate, DataSummary, ModelResult, NumberCategory, MAX_CONFIDENCE};
pub use prediction::{CombinedPrediction, EnsemblePrediction, ScoredNumber};
pub use record::{digit_runs, DrawResult, ProcessingStatus, Record, SourceKind};
pub use session::{
    CollectionWindow, PredictionSession, SessionStatus, StatusTransition, TransitionError,
    DEFAULT_WINDOW_DAYS,
};
