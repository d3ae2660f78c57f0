//! lucky-ensemble library interface
//!
//! Ensemble prediction pipeline: three scoring adapters feed a weighted
//! combiner, orchestrated per draw date by the session manager and
//! persisted through a SQLite store.

pub mod adapters;
pub mod combiner;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod session_manager;
pub mod types;
pub mod utils;

pub use crate::config::{AppConfig, EnsembleSettings, FailurePolicy};
pub use crate::db::SqliteStore;
pub use crate::error::{PipelineError, Result};
pub use crate::session_manager::SessionManager;
