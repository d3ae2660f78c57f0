//! Configuration for lucky-ensemble
//!
//! The bootstrap TOML file (root folder, database path, logging) is shared
//! with `lucky_common`. Pipeline tuning lives under an `[ensemble]` table:
//!
//! ```toml
//! root_folder = "/srv/lucky"
//!
//! [ensemble]
//! window_days = 16
//! failure_policy = "fail_open"
//! seed = 42
//!
//! [ensemble.weights]
//! text_source = 0.4
//!
//! [ensemble.symbols]
//! snake = ["56", "65"]
//! ```
//!
//! `LUCKY_SEED` in the environment overrides `ensemble.seed`.

use crate::adapters::SymbolDictionary;
use crate::models::{AdapterKind, DEFAULT_WINDOW_DAYS};
use crate::utils::DEFAULT_MAX_LOCK_WAIT_MS;
use chrono::{Datelike, NaiveDate};
use lucky_common::config::{read_toml, TomlConfig};
use lucky_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Module name used for the default config file location
pub const MODULE_NAME: &str = "lucky-ensemble";

/// Environment variable overriding the random seed
pub const SEED_ENV: &str = "LUCKY_SEED";

/// What to do when a scoring adapter fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and combine the remaining adapters
    #[default]
    FailOpen,
    /// Abort the run
    FailAll,
}

/// Per-adapter ensemble weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterWeights {
    pub text_source: f64,
    pub symbolic: f64,
    pub statistical: f64,
}

impl AdapterWeights {
    pub fn for_adapter(&self, kind: AdapterKind) -> f64 {
        match kind {
            AdapterKind::TextSource => self.text_source,
            AdapterKind::Symbolic => self.symbolic,
            AdapterKind::Statistical => self.statistical,
        }
    }
}

impl Default for AdapterWeights {
    fn default() -> Self {
        Self {
            text_source: 0.4,
            symbolic: 0.3,
            statistical: 0.3,
        }
    }
}

/// Pipeline settings from the `[ensemble]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleSettings {
    pub weights: AdapterWeights,
    /// Collection window length in days
    pub window_days: u32,
    /// Maximum records analyzed per session
    pub record_limit: usize,
    /// Draw results handed to the adapters
    pub history_depth: usize,
    pub failure_policy: FailurePolicy,
    /// Fixed seed; the draw date is used when unset
    pub seed: Option<u64>,
    /// Dream symbol dictionary; replaces the built-in table when given
    pub symbols: SymbolDictionary,
    /// Upper bound for database lock retries
    pub max_lock_wait_ms: u64,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            weights: AdapterWeights::default(),
            window_days: DEFAULT_WINDOW_DAYS,
            record_limit: 100,
            history_depth: 30,
            failure_policy: FailurePolicy::default(),
            seed: None,
            symbols: SymbolDictionary::default(),
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }
}

impl EnsembleSettings {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        for kind in [AdapterKind::TextSource, AdapterKind::Symbolic, AdapterKind::Statistical] {
            let weight = self.weights.for_adapter(kind);
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!("Invalid weight for {}: {}", kind, weight)));
            }
        }
        if self.window_days == 0 {
            return Err(Error::Config("window_days must be at least 1".to_string()));
        }
        if self.record_limit == 0 {
            return Err(Error::Config("record_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Seed for a run targeting `draw_date`
    pub fn seed_for(&self, draw_date: NaiveDate) -> u64 {
        self.seed
            .unwrap_or_else(|| u64::try_from(draw_date.num_days_from_ce()).unwrap_or_default())
    }

    /// Apply `LUCKY_SEED` if set
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(SEED_ENV) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let seed = raw
                    .parse::<u64>()
                    .map_err(|e| Error::Config(format!("{} must be an unsigned integer: {}", SEED_ENV, e)))?;
                info!(seed, "Random seed taken from {}", SEED_ENV);
                self.seed = Some(seed);
            }
        }
        Ok(())
    }
}

/// Full configuration file: bootstrap keys plus `[ensemble]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub bootstrap: TomlConfig,

    #[serde(default)]
    pub ensemble: EnsembleSettings,
}

impl AppConfig {
    /// Load from `path`, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: AppConfig = read_toml(path)?;
        config.ensemble.apply_env_overrides()?;
        config.ensemble.validate()?;
        Ok(config)
    }
}
