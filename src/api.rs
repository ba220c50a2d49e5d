//! Typed service boundary.
//!
//! Request and response records for the generation and query operations,
//! serde-ready for whatever transport the host application uses.
//! [`TimetableService`] maps them onto a [`GenerationManager`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::index::{TimetableIndex, TimetableView, WeekQuery};
use crate::models::{DomainSnapshot, SessionAssignment, WeekSpan};
use crate::session::{GenerationManager, RunId, RunProgress, RunState};

/// Request to generate a scope's timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Entities of the scope.
    pub snapshot: DomainSnapshot,
    /// Overrides the service's seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GenerateRequest {
    /// Creates a request with the service's default seed.
    pub fn new(snapshot: DomainSnapshot) -> Self {
        Self {
            snapshot,
            seed: None,
        }
    }

    /// Overrides the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Accepted generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Run to poll.
    pub run_id: RunId,
    /// Scope being generated.
    pub scope: String,
    /// State at acceptance.
    pub state: RunState,
}

/// Request to mark a scope's timetable as outdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidateRequest {
    /// Scope whose entities changed.
    pub scope: String,
}

/// Outcome of an invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidateResponse {
    /// Scope.
    pub scope: String,
    /// Whether a published timetable was marked.
    pub invalidated: bool,
}

/// Timetable query, one variant per view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum TimetableQuery {
    /// Sessions of a teacher.
    Teacher {
        /// Scope.
        scope: String,
        /// Teacher.
        teacher_id: String,
    },
    /// Sessions of a cohort.
    Class {
        /// Scope.
        scope: String,
        /// Cohort.
        cohort_id: String,
    },
    /// Sessions in a classroom.
    Classroom {
        /// Scope.
        scope: String,
        /// Classroom.
        classroom_id: String,
    },
    /// Whole week, optionally filtered.
    Week {
        /// Scope.
        scope: String,
        /// Filters.
        #[serde(default)]
        filter: WeekQuery,
    },
}

impl TimetableQuery {
    /// Scope queried.
    pub fn scope(&self) -> &str {
        match self {
            Self::Teacher { scope, .. }
            | Self::Class { scope, .. }
            | Self::Classroom { scope, .. }
            | Self::Week { scope, .. } => scope,
        }
    }
}

/// One row of a timetable response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Offering.
    pub offering_id: String,
    /// Weekly occurrence.
    pub occurrence: u32,
    /// Course.
    pub course_id: String,
    /// Cohort.
    pub cohort_id: String,
    /// Teacher.
    pub teacher_id: String,
    /// Classroom.
    pub classroom_id: String,
    /// Day index.
    pub day: u8,
    /// First period.
    pub start_period: u8,
    /// Periods covered.
    pub periods: u8,
    /// Teaching weeks.
    pub weeks: WeekSpan,
}

impl From<SessionAssignment> for TimetableEntry {
    fn from(a: SessionAssignment) -> Self {
        Self {
            offering_id: a.session.offering_id,
            occurrence: a.session.occurrence,
            course_id: a.course_id,
            cohort_id: a.cohort_id,
            teacher_id: a.teacher_id,
            classroom_id: a.classroom_id,
            day: a.slot.day,
            start_period: a.slot.start,
            periods: a.slot.len,
            weeks: a.weeks,
        }
    }
}

/// Timetable query result.
///
/// `generated == false` means no timetable exists for the scope yet;
/// that is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableResponse {
    /// Scope.
    pub scope: String,
    /// Whether a timetable was ever published.
    pub generated: bool,
    /// Published version.
    pub version: Option<u64>,
    /// Generation timestamp.
    pub generated_at: Option<DateTime<Utc>>,
    /// Whether entity data changed since publication.
    pub stale: bool,
    /// Matching sessions.
    pub entries: Vec<TimetableEntry>,
}

impl TimetableResponse {
    fn from_view(scope: &str, view: TimetableView) -> Self {
        match view {
            TimetableView::NotGenerated => Self {
                scope: scope.to_string(),
                generated: false,
                version: None,
                generated_at: None,
                stale: false,
                entries: Vec::new(),
            },
            TimetableView::Ready(view) => Self {
                scope: view.scope,
                generated: true,
                version: Some(view.version),
                generated_at: Some(view.generated_at),
                stale: view.stale,
                entries: view.entries.into_iter().map(TimetableEntry::from).collect(),
            },
        }
    }
}

/// Generation and query operations over one manager.
#[derive(Debug, Default)]
pub struct TimetableService {
    manager: GenerationManager,
}

impl TimetableService {
    /// Creates a service with the given engine configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            manager: GenerationManager::new(config),
        }
    }

    /// Wraps an existing manager.
    pub fn with_manager(manager: GenerationManager) -> Self {
        Self { manager }
    }

    /// Underlying manager.
    pub fn manager(&self) -> &GenerationManager {
        &self.manager
    }

    /// Published timetables.
    pub fn index(&self) -> &Arc<TimetableIndex> {
        self.manager.index()
    }

    /// Starts a generation run.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `InvalidConfig` or `ConcurrentRunConflict`.
    pub fn start_generation(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let mut config = self.manager.config().clone();
        if let Some(seed) = request.seed {
            config.seed = seed;
        }
        let run_id = self.manager.start_with(&request.snapshot, config)?;
        let progress = self.manager.progress(run_id)?;
        Ok(GenerateResponse {
            run_id,
            scope: progress.scope,
            state: progress.state,
        })
    }

    /// Reports on a run.
    ///
    /// # Errors
    ///
    /// `UnknownRun`.
    pub fn generation_progress(&self, run_id: RunId) -> Result<RunProgress> {
        self.manager.progress(run_id)
    }

    /// Cancels a live run.
    ///
    /// # Errors
    ///
    /// `UnknownRun` or `RunFinished`.
    pub fn cancel_generation(&self, run_id: RunId) -> Result<RunProgress> {
        self.manager.cancel(run_id)
    }

    /// Marks a scope's timetable as outdated.
    pub fn invalidate(&self, request: &InvalidateRequest) -> InvalidateResponse {
        InvalidateResponse {
            scope: request.scope.clone(),
            invalidated: self.manager.invalidate(&request.scope),
        }
    }

    /// Answers a timetable query.
    pub fn query(&self, query: &TimetableQuery) -> TimetableResponse {
        let index = self.manager.index();
        let view = match query {
            TimetableQuery::Teacher { scope, teacher_id } => index.teacher_view(scope, teacher_id),
            TimetableQuery::Class { scope, cohort_id } => index.cohort_view(scope, cohort_id),
            TimetableQuery::Classroom {
                scope,
                classroom_id,
            } => index.classroom_view(scope, classroom_id),
            TimetableQuery::Week { scope, filter } => index.week_view(scope, filter),
        };
        TimetableResponse::from_view(query.scope(), view)
    }

    /// Sessions taught by a teacher.
    pub fn teacher_timetable(&self, scope: &str, teacher_id: &str) -> TimetableResponse {
        self.query(&TimetableQuery::Teacher {
            scope: scope.to_string(),
            teacher_id: teacher_id.to_string(),
        })
    }

    /// Sessions attended by a cohort.
    pub fn class_timetable(&self, scope: &str, cohort_id: &str) -> TimetableResponse {
        self.query(&TimetableQuery::Class {
            scope: scope.to_string(),
            cohort_id: cohort_id.to_string(),
        })
    }

    /// Sessions held in a classroom.
    pub fn classroom_timetable(&self, scope: &str, classroom_id: &str) -> TimetableResponse {
        self.query(&TimetableQuery::Classroom {
            scope: scope.to_string(),
            classroom_id: classroom_id.to_string(),
        })
    }

    /// Whole week, optionally filtered.
    pub fn week_timetable(&self, scope: &str, filter: WeekQuery) -> TimetableResponse {
        self.query(&TimetableQuery::Week {
            scope: scope.to_string(),
            filter,
        })
    }
}
