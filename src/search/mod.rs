//! Two-phase timetable search.
//!
//! # Algorithm
//!
//! 1. **Feasibility**: chronological backtracking over sessions with
//!    forward checking. The next session is the one with the fewest live
//!    candidates (most-constrained-first), ties broken by offering
//!    priority then session key. Values are tried in static domain order.
//!    Exhausting the root proves infeasibility.
//! 2. **Improvement**: simulated annealing over relocate and swap moves
//!    that preserve every hard constraint, seeded for reproducibility,
//!    followed by an optional steepest-ascent polish. The best assignment
//!    seen is returned.
//!
//! Both phases poll [`RunSignals`] for cancellation and report progress
//! through it.
//!
//! # Complexity
//! Worst case exponential in the number of sessions for phase 1;
//! bounded by `max_nodes`. Phase 2 is O(iterations) with O(1) move
//! evaluation plus O(domain) per polish relocation.
//!
//! # Reference
//! - Haralick & Elliott (1980), "Increasing tree search efficiency for
//!   constraint satisfaction problems"
//! - Kirkpatrick et al. (1983), "Optimization by Simulated Annealing"

mod backtrack;
mod improve;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{Assignment, DomainModel};
use crate::evaluator::ConstraintEvaluator;

use backtrack::{Backtracker, FeasibilityOutcome};
use improve::{ImproveOutcome, Improver};

const PROGRESS_SCALE: f64 = 1_000_000.0;

/// Cancellation flag and progress counter shared between a run's worker
/// and its observers.
#[derive(Debug, Default)]
pub struct RunSignals {
    cancelled: AtomicBool,
    progress: AtomicU64,
}

impl RunSignals {
    /// Creates fresh signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Reports progress in `[0, 1]`. Lower values than already reported
    /// are ignored, so observers never see progress go backwards.
    pub fn report(&self, fraction: f64) {
        let scaled = (fraction.clamp(0.0, 1.0) * PROGRESS_SCALE) as u64;
        self.progress.fetch_max(scaled, Ordering::Relaxed);
    }

    /// Progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress.load(Ordering::Relaxed) as f64 / PROGRESS_SCALE
    }
}

/// Counters collected during a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Tentative bindings tried in phase 1.
    pub nodes: u64,
    /// Choice points exhausted in phase 1.
    pub backtracks: u64,
    /// Most sessions bound at once in phase 1.
    pub max_depth: usize,
    /// Move attempts in phase 2.
    pub iterations: u64,
    /// Accepted moves that did not lower the score.
    pub improving_moves: u64,
    /// Accepted moves that lowered the score.
    pub worsening_moves: u64,
    /// Polish sweeps performed.
    pub polish_passes: u32,
    /// Wall-clock time of the whole search (ms).
    pub elapsed_ms: u64,
}

/// A complete feasible assignment and its score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best assignment found.
    pub assignment: Assignment,
    /// Score of the first feasible assignment.
    pub initial_score: f64,
    /// Score of the returned assignment.
    pub score: f64,
    /// Search counters.
    pub stats: SearchStats,
}

/// How a search ended.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// A feasible timetable was found (and improved).
    Solved(SearchResult),
    /// Proven that no feasible timetable exists.
    Infeasible(SearchStats),
    /// Budget exhausted before feasibility was decided.
    TimedOut(SearchStats),
    /// Cancellation observed.
    Cancelled(SearchStats),
}

impl SearchOutcome {
    /// Search counters regardless of outcome.
    pub fn stats(&self) -> &SearchStats {
        match self {
            Self::Solved(result) => &result.stats,
            Self::Infeasible(stats) | Self::TimedOut(stats) | Self::Cancelled(stats) => stats,
        }
    }
}

/// Runs both search phases over one model.
pub struct SearchEngine<'a> {
    model: &'a DomainModel,
    config: &'a EngineConfig,
}

impl<'a> SearchEngine<'a> {
    /// Creates an engine.
    pub fn new(model: &'a DomainModel, config: &'a EngineConfig) -> Self {
        Self { model, config }
    }

    /// Runs the search to completion, cancellation or budget exhaustion.
    pub fn run(&self, signals: &RunSignals) -> SearchOutcome {
        let started = Instant::now();
        let deadline = self.config.budget.time_limit().map(|limit| started + limit);
        let evaluator = ConstraintEvaluator::new(self.model, &self.config.weights);
        let elapsed_ms = || duration_ms(started.elapsed());

        info!(
            scope = self.model.scope(),
            sessions = self.model.session_count(),
            "feasibility search started"
        );
        let (outcome, mut stats) = Backtracker::new(
            self.model,
            evaluator,
            signals,
            deadline,
            self.config.budget.max_nodes,
        )
        .run();

        let assignment = match outcome {
            FeasibilityOutcome::Found(assignment) => assignment,
            FeasibilityOutcome::Infeasible => {
                stats.elapsed_ms = elapsed_ms();
                warn!(scope = self.model.scope(), nodes = stats.nodes, "proven infeasible");
                return SearchOutcome::Infeasible(stats);
            }
            FeasibilityOutcome::TimedOut => {
                stats.elapsed_ms = elapsed_ms();
                warn!(scope = self.model.scope(), nodes = stats.nodes, "feasibility budget exhausted");
                return SearchOutcome::TimedOut(stats);
            }
            FeasibilityOutcome::Cancelled => {
                stats.elapsed_ms = elapsed_ms();
                debug!(scope = self.model.scope(), "cancelled during feasibility search");
                return SearchOutcome::Cancelled(stats);
            }
        };
        signals.report(0.5);

        let initial_score = evaluator.score(&assignment);
        debug!(
            scope = self.model.scope(),
            nodes = stats.nodes,
            backtracks = stats.backtracks,
            initial_score,
            "feasible assignment found"
        );

        let improver = Improver::new(
            evaluator,
            &self.config.budget,
            self.config.seed,
            signals,
            deadline,
        );
        match improver.run(assignment, initial_score, &mut stats) {
            ImproveOutcome::Cancelled => {
                stats.elapsed_ms = elapsed_ms();
                debug!(scope = self.model.scope(), "cancelled during improvement");
                SearchOutcome::Cancelled(stats)
            }
            ImproveOutcome::Done { assignment, score } => {
                stats.elapsed_ms = elapsed_ms();
                info!(
                    scope = self.model.scope(),
                    initial_score,
                    score,
                    elapsed_ms = stats.elapsed_ms,
                    "search finished"
                );
                signals.report(1.0);
                SearchOutcome::Solved(SearchResult {
                    assignment,
                    initial_score,
                    score,
                    stats,
                })
            }
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

/// Shared stop check for both phases.
#[inline]
fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
