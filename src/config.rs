//! Engine configuration.
//!
//! Groups the objective weights, the search budget and the random seed.
//! All fields have defaults; partial configs deserialize with
//! `#[serde(default)]`.
//!
//! # Objective
//!
//! ```text
//! score = Σ preference weight of every covered (teacher, day, period)
//!       − spread_penalty × #(same-day session pairs of one offering)
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TimetableError};

/// Default penalty per same-day session pair of one offering.
pub const DEFAULT_SPREAD_PENALTY: f64 = 10.0;

/// Default random seed for the improvement phase.
pub const DEFAULT_SEED: u64 = 42;

/// Soft-objective weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Penalty per pair of same-day sessions of one offering.
    pub spread_penalty: f64,
    /// Multiplier applied to every teacher preference weight.
    pub preference_scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            spread_penalty: DEFAULT_SPREAD_PENALTY,
            preference_scale: 1.0,
        }
    }
}

/// Search budget for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    /// Maximum tentative bindings in the feasibility phase.
    pub max_nodes: u64,
    /// Wall-clock limit for the whole run (ms). `None` = unlimited.
    pub time_limit_ms: Option<u64>,
    /// Move attempts in the improvement phase.
    pub improvement_iterations: u64,
    /// Worsening moves the improver may accept in total.
    pub max_non_improving: u64,
    /// Starting temperature for worsening-move acceptance.
    pub initial_temperature: f64,
    /// Geometric cooling factor per iteration, in (0, 1].
    pub cooling_rate: f64,
    /// Probability of trying a swap instead of a relocation.
    pub swap_probability: f64,
    /// Finish with a steepest-ascent sweep over relocations.
    pub polish: bool,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_nodes: 2_000_000,
            time_limit_ms: Some(30_000),
            improvement_iterations: 20_000,
            max_non_improving: 2_000,
            initial_temperature: 2.0,
            cooling_rate: 0.9995,
            swap_probability: 0.3,
            polish: true,
        }
    }
}

impl SearchBudget {
    /// Wall-clock limit as a duration.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Objective weights.
    pub weights: ScoreWeights,
    /// Search budget.
    pub budget: SearchBudget,
    /// Seed for the improvement phase.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            budget: SearchBudget::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Sets the spread penalty.
    pub fn with_spread_penalty(mut self, penalty: f64) -> Self {
        self.weights.spread_penalty = penalty;
        self
    }

    /// Sets the feasibility-phase node budget.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.budget.max_nodes = max_nodes;
        self
    }

    /// Sets the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.budget.time_limit_ms = limit.map(|d| d.as_millis() as u64);
        self
    }

    /// Sets the improvement iteration budget.
    pub fn with_improvement_iterations(mut self, iterations: u64) -> Self {
        self.budget.improvement_iterations = iterations;
        self
    }

    /// Enables or disables the final polish sweep.
    pub fn with_polish(mut self, polish: bool) -> Self {
        self.budget.polish = polish;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns `TimetableError::InvalidConfig` if any parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        if !w.spread_penalty.is_finite() || w.spread_penalty < 0.0 {
            return Err(TimetableError::invalid_config(format!(
                "spread_penalty must be finite and >= 0, got {}",
                w.spread_penalty
            )));
        }
        if !w.preference_scale.is_finite() || w.preference_scale < 0.0 {
            return Err(TimetableError::invalid_config(format!(
                "preference_scale must be finite and >= 0, got {}",
                w.preference_scale
            )));
        }

        let b = &self.budget;
        if b.max_nodes == 0 {
            return Err(TimetableError::invalid_config("max_nodes must be > 0"));
        }
        if b.time_limit_ms == Some(0) {
            return Err(TimetableError::invalid_config("time_limit_ms must be > 0"));
        }
        if !b.initial_temperature.is_finite() || b.initial_temperature <= 0.0 {
            return Err(TimetableError::invalid_config(format!(
                "initial_temperature must be > 0, got {}",
                b.initial_temperature
            )));
        }
        if !(b.cooling_rate > 0.0 && b.cooling_rate <= 1.0) {
            return Err(TimetableError::invalid_config(format!(
                "cooling_rate must be in (0, 1], got {}",
                b.cooling_rate
            )));
        }
        if !(0.0..=1.0).contains(&b.swap_probability) {
            return Err(TimetableError::invalid_config(format!(
                "swap_probability must be in [0, 1], got {}",
                b.swap_probability
            )));
        }
        Ok(())
    }
}
