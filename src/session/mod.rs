//! Generation run lifecycle.
//!
//! A run moves through
//!
//! ```text
//! Pending ─► Running ─┬─► Succeeded
//!                     ├─► Infeasible
//!                     ├─► TimedOut
//!                     ├─► Cancelled
//!                     └─► Failed
//! ```
//!
//! Each run owns a worker thread. At most one run per scope is active;
//! a second start for the same scope is rejected until the first run
//! ends or is cancelled. A run's final state
//! and its publication happen under the run's state lock, and so does
//! cancellation, so a cancelled run never publishes and a published run
//! can no longer be cancelled.
//!
//! Finished runs stay queryable until [`GenerationManager::forget`] drops
//! them or newer runs of the same scope push them out of the retained
//! history.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::DomainModel;
use crate::error::{Result, TimetableError};
use crate::evaluator::audited;
use crate::index::TimetableIndex;
use crate::kpi::TimetableKpi;
use crate::models::{DomainSnapshot, Timetable, Violation};
use crate::search::{RunSignals, SearchEngine, SearchOutcome, SearchStats};

/// Finished runs kept per scope.
const RETAINED_RUNS: usize = 16;

/// Identifier of a generation run.
pub type RunId = Uuid;

/// Lifecycle state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Accepted, worker not started yet.
    Pending,
    /// Searching.
    Running,
    /// Timetable published.
    Succeeded {
        /// Published version.
        version: u64,
        /// Objective value.
        score: f64,
    },
    /// Proven infeasible.
    Infeasible,
    /// Budget exhausted before a feasible timetable was found.
    TimedOut,
    /// Cancelled by a caller.
    Cancelled,
    /// Worker failure.
    Failed {
        /// Failure description.
        message: String,
    },
}

impl RunState {
    /// Whether the run has ended.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Short state name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded { .. } => "succeeded",
            Self::Infeasible => "infeasible",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Point-in-time report on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Run.
    pub run_id: RunId,
    /// Scope.
    pub scope: String,
    /// Current state.
    pub state: RunState,
    /// Progress in `[0, 1]`, never decreasing.
    pub fraction: f64,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time, once terminal.
    pub finished_at: Option<DateTime<Utc>>,
    /// Search counters, once terminal.
    pub stats: Option<SearchStats>,
    /// Quality metrics of the published timetable.
    pub kpi: Option<TimetableKpi>,
    /// Audit findings that kept a timetable from being published.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

#[derive(Debug)]
struct RunStatus {
    state: RunState,
    finished_at: Option<DateTime<Utc>>,
    stats: Option<SearchStats>,
    kpi: Option<TimetableKpi>,
    violations: Vec<Violation>,
}

#[derive(Debug)]
struct Run {
    id: RunId,
    scope: String,
    started_at: DateTime<Utc>,
    signals: RunSignals,
    status: Mutex<RunStatus>,
    /// Signalled once `status` turns terminal.
    done: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Run {
    fn conclude(&self, status: &mut RunStatus, state: RunState) {
        status.state = state;
        status.finished_at = Some(Utc::now());
        self.done.notify_all();
    }

    fn is_finished(&self) -> bool {
        self.status.lock().state.is_terminal()
    }

    fn progress(&self) -> RunProgress {
        let status = self.status.lock();
        RunProgress {
            run_id: self.id,
            scope: self.scope.clone(),
            state: status.state.clone(),
            fraction: self.signals.progress(),
            started_at: self.started_at,
            finished_at: status.finished_at,
            stats: status.stats.clone(),
            kpi: status.kpi.clone(),
            violations: status.violations.clone(),
        }
    }
}

type ActiveScopes = Arc<Mutex<HashMap<String, RunId>>>;

/// Starts, tracks and cancels generation runs and owns the published
/// timetables.
#[derive(Debug)]
pub struct GenerationManager {
    config: EngineConfig,
    index: Arc<TimetableIndex>,
    runs: RwLock<HashMap<RunId, Arc<Run>>>,
    active: ActiveScopes,
}

impl Default for GenerationManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GenerationManager {
    /// Creates a manager with a fresh index.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_index(config, Arc::new(TimetableIndex::new()))
    }

    /// Creates a manager publishing into an existing index.
    pub fn with_index(config: EngineConfig, index: Arc<TimetableIndex>) -> Self {
        Self {
            config,
            index,
            runs: RwLock::new(HashMap::new()),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Default engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Published timetables.
    pub fn index(&self) -> &Arc<TimetableIndex> {
        &self.index
    }

    /// Starts a run with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::start_with`].
    pub fn start(&self, snapshot: &DomainSnapshot) -> Result<RunId> {
        self.start_with(snapshot, self.config.clone())
    }

    /// Validates the snapshot and starts a run in the background.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` / `InvalidInput`: nothing was started.
    /// - `ConcurrentRunConflict`: the scope already has an active run.
    pub fn start_with(&self, snapshot: &DomainSnapshot, config: EngineConfig) -> Result<RunId> {
        config.validate()?;
        let model = DomainModel::build(snapshot)?;
        let scope = model.scope().to_string();
        let sessions = model.session_count();
        let run_id = Uuid::new_v4();

        {
            let mut active = self.active.lock();
            if let Some(&holder) = active.get(&scope) {
                warn!(%scope, active = %holder, "rejected concurrent generation");
                return Err(TimetableError::ConcurrentRunConflict {
                    scope,
                    active: holder,
                });
            }
            active.insert(scope.clone(), run_id);
        }

        let run = Arc::new(Run {
            id: run_id,
            scope: scope.clone(),
            started_at: Utc::now(),
            signals: RunSignals::new(),
            status: Mutex::new(RunStatus {
                state: RunState::Pending,
                finished_at: None,
                stats: None,
                kpi: None,
                violations: Vec::new(),
            }),
            done: Condvar::new(),
            worker: Mutex::new(None),
        });
        {
            let mut runs = self.runs.write();
            runs.insert(run_id, Arc::clone(&run));
            prune(&mut runs, &scope);
        }

        let worker = Worker {
            run: Arc::clone(&run),
            model,
            config,
            index: Arc::clone(&self.index),
            active: Arc::clone(&self.active),
        };
        let spawned = thread::Builder::new()
            .name(format!("timetable-{scope}"))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => *run.worker.lock() = Some(handle),
            Err(e) => {
                release(&self.active, &scope, run_id);
                let message = format!("failed to spawn worker: {e}");
                let mut status = run.status.lock();
                run.conclude(
                    &mut status,
                    RunState::Failed {
                        message: message.clone(),
                    },
                );
                return Err(TimetableError::internal(message));
            }
        }

        info!(%run_id, %scope, sessions, "generation run started");
        Ok(run_id)
    }

    /// Current report on a run.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` for an unknown ID.
    pub fn progress(&self, run_id: RunId) -> Result<RunProgress> {
        Ok(self.run(run_id)?.progress())
    }

    /// Cancels a live run. The run publishes nothing and its scope is free
    /// for a new run as soon as this returns.
    ///
    /// # Errors
    ///
    /// - `UnknownRun`: unknown ID.
    /// - `RunFinished`: the run already reached a terminal state.
    pub fn cancel(&self, run_id: RunId) -> Result<RunProgress> {
        let run = self.run(run_id)?;
        {
            let mut status = run.status.lock();
            if status.state.is_terminal() {
                return Err(TimetableError::RunFinished {
                    run_id,
                    state: status.state.label().to_string(),
                });
            }
            run.signals.cancel();
            run.conclude(&mut status, RunState::Cancelled);
            release(&self.active, &run.scope, run_id);
        }
        info!(%run_id, scope = %run.scope, "generation run cancelled");
        Ok(run.progress())
    }

    /// Blocks until the run reaches a terminal state and returns it.
    ///
    /// The first caller also joins the worker thread; concurrent callers
    /// park until the state is final.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` for an unknown ID.
    pub fn wait(&self, run_id: RunId) -> Result<RunState> {
        let run = self.run(run_id)?;
        let handle = run.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(%run_id, "worker thread aborted");
                let mut status = run.status.lock();
                if !status.state.is_terminal() {
                    run.conclude(
                        &mut status,
                        RunState::Failed {
                            message: "worker thread aborted".to_string(),
                        },
                    );
                }
                release(&self.active, &run.scope, run_id);
            }
        }
        let mut status = run.status.lock();
        while !status.state.is_terminal() {
            run.done.wait(&mut status);
        }
        Ok(status.state.clone())
    }

    /// Drops a finished run's record.
    ///
    /// Returns false, keeping the record, while the run is still live.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` for an unknown ID.
    pub fn forget(&self, run_id: RunId) -> Result<bool> {
        let mut runs = self.runs.write();
        let run = runs.get(&run_id).ok_or(TimetableError::UnknownRun(run_id))?;
        if !run.is_finished() {
            return Ok(false);
        }
        runs.remove(&run_id);
        Ok(true)
    }

    /// Runs a generation to completion and returns the published timetable.
    ///
    /// # Errors
    ///
    /// Start errors as in [`Self::start_with`], then `Infeasible`,
    /// `TimedOut`, `Cancelled` or `Internal` by terminal state.
    pub fn generate(&self, snapshot: &DomainSnapshot) -> Result<Arc<Timetable>> {
        let run_id = self.start(snapshot)?;
        let scope = snapshot.scope.clone();
        match self.wait(run_id)? {
            RunState::Succeeded { .. } => self
                .index
                .current(&scope)
                .ok_or_else(|| TimetableError::internal("published timetable missing")),
            RunState::Infeasible => Err(TimetableError::Infeasible { scope }),
            RunState::TimedOut => Err(TimetableError::TimedOut { scope }),
            RunState::Cancelled => Err(TimetableError::Cancelled { run_id }),
            RunState::Failed { message } => Err(TimetableError::internal(message)),
            state @ (RunState::Pending | RunState::Running) => Err(TimetableError::internal(
                format!("run ended in non-terminal state {}", state.label()),
            )),
        }
    }

    /// Marks the scope's published timetable as outdated after entity
    /// changes. Returns false if nothing was published for the scope.
    pub fn invalidate(&self, scope: &str) -> bool {
        let marked = self.index.mark_stale(scope);
        if marked {
            info!(%scope, "timetable invalidated");
        }
        marked
    }

    /// Active run of a scope.
    pub fn active_run(&self, scope: &str) -> Option<RunId> {
        self.active.lock().get(scope).copied()
    }

    fn run(&self, run_id: RunId) -> Result<Arc<Run>> {
        self.runs
            .read()
            .get(&run_id)
            .cloned()
            .ok_or(TimetableError::UnknownRun(run_id))
    }
}

struct Worker {
    run: Arc<Run>,
    model: DomainModel,
    config: EngineConfig,
    index: Arc<TimetableIndex>,
    active: ActiveScopes,
}

impl Worker {
    fn run(self) {
        let run = &self.run;
        let proceed = {
            let mut status = run.status.lock();
            if status.state == RunState::Pending {
                status.state = RunState::Running;
                true
            } else {
                false
            }
        };

        if proceed {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                SearchEngine::new(&self.model, &self.config).run(&run.signals)
            }));
            self.finish(outcome);
        }
        release(&self.active, &run.scope, run.id);
    }

    fn finish(&self, outcome: thread::Result<SearchOutcome>) {
        let run = &self.run;
        let mut status = run.status.lock();
        if status.state == RunState::Cancelled {
            if let Ok(outcome) = &outcome {
                status.stats = Some(outcome.stats().clone());
            }
            return;
        }

        let state = match outcome {
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(run_id = %run.id, %message, "generation worker panicked");
                RunState::Failed { message }
            }
            Ok(SearchOutcome::Solved(result)) => {
                status.stats = Some(result.stats.clone());
                let timetable = audited(
                    &self.model,
                    Timetable::new(
                        run.scope.clone(),
                        self.model.materialize(&result.assignment),
                        result.score,
                    ),
                );
                if timetable.is_feasible() {
                    status.kpi = Some(TimetableKpi::calculate(&timetable, &self.model));
                    let version = self.index.publish(timetable);
                    info!(run_id = %run.id, scope = %run.scope, version, score = result.score, "timetable published");
                    RunState::Succeeded {
                        version,
                        score: result.score,
                    }
                } else {
                    let count = timetable.violations.len();
                    error!(run_id = %run.id, violations = count, "search produced an invalid timetable");
                    status.violations = timetable.violations;
                    RunState::Failed {
                        message: format!("audit found {count} violation(s)"),
                    }
                }
            }
            Ok(SearchOutcome::Infeasible(stats)) => {
                status.stats = Some(stats);
                RunState::Infeasible
            }
            Ok(SearchOutcome::TimedOut(stats)) => {
                status.stats = Some(stats);
                RunState::TimedOut
            }
            Ok(SearchOutcome::Cancelled(stats)) => {
                status.stats = Some(stats);
                RunState::Cancelled
            }
        };
        release(&self.active, &run.scope, run.id);
        run.conclude(&mut status, state);
    }
}

/// Keeps at most [`RETAINED_RUNS`] finished runs of `scope`, newest first.
fn prune(runs: &mut HashMap<RunId, Arc<Run>>, scope: &str) {
    let mut finished: Vec<(DateTime<Utc>, RunId)> = runs
        .values()
        .filter(|run| run.scope == scope && run.is_finished())
        .map(|run| (run.started_at, run.id))
        .collect();
    if finished.len() <= RETAINED_RUNS {
        return;
    }
    finished.sort_unstable();
    let excess = finished.len() - RETAINED_RUNS;
    for (_, id) in finished.into_iter().take(excess) {
        runs.remove(&id);
    }
}

fn release(active: &Mutex<HashMap<String, RunId>>, scope: &str, run_id: RunId) {
    let mut active = active.lock();
    if active.get(scope) == Some(&run_id) {
        active.remove(scope);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests::small_snapshot;
    use crate::models::{Classroom, Cohort, Course, Offering, Teacher, WeekGrid};

    /// 12 one-period sessions of one cohort on 11 cells: infeasible, and
    /// slow to prove.
    fn pigeonhole() -> DomainSnapshot {
        DomainSnapshot::new("hard")
            .with_grid(WeekGrid::new(1, 11))
            .with_teacher(Teacher::new("T").with_qualification("x"))
            .with_course(Course::new("C", 12, 1).with_subject("x"))
            .with_cohort(Cohort::new("K", 10))
            .with_classroom(Classroom::new("R", 10))
            .with_offering(Offering::new("O", "C", "K", "hard"))
    }

    fn unbounded() -> EngineConfig {
        EngineConfig::default()
            .with_max_nodes(u64::MAX)
            .with_time_limit(None)
    }

    #[test]
    fn test_run_succeeds_and_publishes() {
        let manager = GenerationManager::default();
        let run_id = manager.start(&small_snapshot()).unwrap();
        let state = manager.wait(run_id).unwrap();
        assert!(matches!(state, RunState::Succeeded { version: 1, .. }));

        let progress = manager.progress(run_id).unwrap();
        assert!((progress.fraction - 1.0).abs() < 1e-9);
        assert!(progress.finished_at.is_some());
        assert!(progress.stats.is_some());
        assert!(progress.violations.is_empty());
        assert_eq!(progress.kpi.unwrap().coverage_rate, 1.0);
        assert_eq!(manager.index().version("fall"), 1);
        assert!(manager.active_run("fall").is_none());
    }

    #[test]
    fn test_invalid_input_starts_nothing() {
        let manager = GenerationManager::default();
        let snap = small_snapshot().with_cohort(Cohort::new("BAD", -3));
        assert!(matches!(
            manager.start(&snap),
            Err(TimetableError::InvalidInput(_))
        ));
        assert!(manager.active_run("fall").is_none());
    }

    #[test]
    fn test_concurrent_run_conflict() {
        let manager = GenerationManager::new(unbounded());
        let first = manager.start(&pigeonhole()).unwrap();
        let second = manager.start(&pigeonhole());
        match second {
            Err(TimetableError::ConcurrentRunConflict { scope, active }) => {
                assert_eq!(scope, "hard");
                assert_eq!(active, first);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }
        manager.cancel(first).unwrap();
        assert_eq!(manager.wait(first).unwrap(), RunState::Cancelled);
        assert!(manager.active_run("hard").is_none());
    }

    #[test]
    fn test_cancel_publishes_nothing() {
        let manager = GenerationManager::new(unbounded());
        let run_id = manager.start(&pigeonhole()).unwrap();
        let progress = manager.cancel(run_id).unwrap();
        assert_eq!(progress.state, RunState::Cancelled);
        assert_eq!(manager.wait(run_id).unwrap(), RunState::Cancelled);
        assert_eq!(manager.index().version("hard"), 0);

        match manager.cancel(run_id) {
            Err(TimetableError::RunFinished { state, .. }) => assert_eq!(state, "cancelled"),
            other => panic!("expected RunFinished, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_run() {
        let manager = GenerationManager::default();
        let id = Uuid::new_v4();
        assert!(matches!(manager.progress(id), Err(TimetableError::UnknownRun(_))));
        assert!(matches!(manager.cancel(id), Err(TimetableError::UnknownRun(_))));
    }

    #[test]
    fn test_generate_maps_terminal_states() {
        let manager = GenerationManager::new(EngineConfig::default().with_max_nodes(20));
        assert!(matches!(
            manager.generate(&pigeonhole()),
            Err(TimetableError::TimedOut { .. })
        ));

        let manager = GenerationManager::default();
        let tt = manager.generate(&small_snapshot()).unwrap();
        assert_eq!(tt.version, 1);
        assert!(tt.is_feasible());
        assert_eq!(tt.session_count(), 5);
    }

    #[test]
    fn test_invalidate_marks_stale() {
        let manager = GenerationManager::default();
        assert!(!manager.invalidate("fall"));
        manager.generate(&small_snapshot()).unwrap();
        assert!(manager.invalidate("fall"));
        let view = manager.index().teacher_view("fall", "T1");
        let crate::index::TimetableView::Ready(view) = view else {
            panic!("expected a timetable");
        };
        assert!(view.stale);
    }

    #[test]
    fn test_cancel_frees_scope_for_restart() {
        let manager = GenerationManager::new(unbounded());
        let first = manager.start(&pigeonhole()).unwrap();
        manager.cancel(first).unwrap();
        assert!(manager.active_run("hard").is_none());

        let second = manager.start(&pigeonhole()).unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.wait(first).unwrap(), RunState::Cancelled);
        // the old worker exiting must not release the new run's scope
        assert_eq!(manager.active_run("hard"), Some(second));

        manager.cancel(second).unwrap();
        assert_eq!(manager.wait(second).unwrap(), RunState::Cancelled);
        assert_eq!(manager.index().version("hard"), 0);
    }

    #[test]
    fn test_concurrent_waiters_see_final_state() {
        let manager = GenerationManager::new(unbounded());
        let run_id = manager.start(&pigeonhole()).unwrap();
        thread::scope(|scope| {
            let waiters: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| manager.wait(run_id).unwrap()))
                .collect();
            manager.cancel(run_id).unwrap();
            for waiter in waiters {
                assert_eq!(waiter.join().unwrap(), RunState::Cancelled);
            }
        });

        let manager = GenerationManager::default();
        let run_id = manager.start(&small_snapshot()).unwrap();
        thread::scope(|scope| {
            let waiters: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| manager.wait(run_id).unwrap()))
                .collect();
            for waiter in waiters {
                assert!(matches!(waiter.join().unwrap(), RunState::Succeeded { version: 1, .. }));
            }
        });
    }

    #[test]
    fn test_forget() {
        let manager = GenerationManager::new(unbounded());
        let run_id = manager.start(&pigeonhole()).unwrap();
        assert!(!manager.forget(run_id).unwrap());
        manager.cancel(run_id).unwrap();
        manager.wait(run_id).unwrap();
        assert!(manager.forget(run_id).unwrap());
        assert!(matches!(manager.progress(run_id), Err(TimetableError::UnknownRun(_))));
        assert!(matches!(manager.forget(run_id), Err(TimetableError::UnknownRun(_))));
    }

    #[test]
    fn test_finished_runs_are_bounded() {
        let manager = GenerationManager::default();
        let ids: Vec<RunId> = (0..RETAINED_RUNS + 4)
            .map(|_| {
                let id = manager.start(&small_snapshot()).unwrap();
                manager.wait(id).unwrap();
                id
            })
            .collect();

        assert_eq!(manager.runs.read().len(), RETAINED_RUNS + 1);
        assert!(matches!(manager.progress(ids[0]), Err(TimetableError::UnknownRun(_))));
        assert!(manager.progress(ids[ids.len() - 1]).is_ok());
        assert_eq!(manager.index().version("fall"), (RETAINED_RUNS + 4) as u64);
    }
}
