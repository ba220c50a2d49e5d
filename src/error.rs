//! Error types for timetable generation.
//!
//! Candidate slots rejected during search are not errors; they are
//! ordinary backtracking branches and never surface here.

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Errors surfaced by the engine at its boundary.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// Malformed or contradictory entity data, rejected before a run starts.
    #[error("Invalid input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),

    /// Engine configuration out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending parameter
        message: String,
    },

    /// Exhaustive search proved that no valid timetable exists.
    #[error("No feasible timetable exists for scope '{scope}'")]
    Infeasible {
        /// Scope of the run
        scope: String,
    },

    /// Budget exhausted before feasibility was decided.
    #[error("Search budget exhausted for scope '{scope}' before a feasible timetable was found")]
    TimedOut {
        /// Scope of the run
        scope: String,
    },

    /// A run was cancelled before it could publish.
    #[error("Generation run {run_id} was cancelled")]
    Cancelled {
        /// Cancelled run
        run_id: Uuid,
    },

    /// A second start request for a scope that is already running.
    #[error("Scope '{scope}' already has a running generation ({active})")]
    ConcurrentRunConflict {
        /// Contended scope
        scope: String,
        /// Run currently holding the scope
        active: Uuid,
    },

    /// No run with this identifier is known.
    #[error("Unknown generation run: {0}")]
    UnknownRun(Uuid),

    /// Operation requires a live run, but the run reached a terminal state.
    #[error("Generation run {run_id} already finished ({state})")]
    RunFinished {
        /// Finished run
        run_id: Uuid,
        /// Terminal state label
        state: String,
    },

    /// Unexpected failure inside a run (worker panic, audit failure).
    #[error("Internal error: {message}")]
    Internal {
        /// Failure description
        message: String,
    },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, TimetableError>;

impl TimetableError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Validation issues carried by an InvalidInput error.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::InvalidInput(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for TimetableError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::InvalidInput(errors)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}
