//! Published timetables and their read views.
//!
//! Each scope holds at most one current timetable plus lookup tables by
//! teacher, cohort and classroom. Publication builds a complete new entry
//! and swaps it in under a short write lock, so readers see either the
//! previous timetable or the new one, never a mix.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{SessionAssignment, Timetable};

/// Filters for the week view. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekQuery {
    /// Only sessions taught in this teaching week.
    pub week: Option<u16>,
    /// Only this teacher's sessions.
    pub teacher_id: Option<String>,
    /// Only this cohort's sessions.
    pub cohort_id: Option<String>,
    /// Only sessions in this classroom.
    pub classroom_id: Option<String>,
}

impl WeekQuery {
    /// Matches every session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one teaching week.
    pub fn in_week(mut self, week: u16) -> Self {
        self.week = Some(week);
        self
    }

    /// Restricts to one teacher.
    pub fn for_teacher(mut self, id: impl Into<String>) -> Self {
        self.teacher_id = Some(id.into());
        self
    }

    /// Restricts to one cohort.
    pub fn for_cohort(mut self, id: impl Into<String>) -> Self {
        self.cohort_id = Some(id.into());
        self
    }

    /// Restricts to one classroom.
    pub fn for_classroom(mut self, id: impl Into<String>) -> Self {
        self.classroom_id = Some(id.into());
        self
    }

    fn matches(&self, a: &SessionAssignment) -> bool {
        self.week.map_or(true, |w| a.weeks.includes(w))
            && self.teacher_id.as_deref().map_or(true, |t| a.teacher_id == t)
            && self.cohort_id.as_deref().map_or(true, |c| a.cohort_id == c)
            && self.classroom_id.as_deref().map_or(true, |r| a.classroom_id == r)
    }
}

/// Entries of one published timetable matching a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    /// Scope.
    pub scope: String,
    /// Published version.
    pub version: u64,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Whether entity data changed since publication.
    pub stale: bool,
    /// Matching bindings, by day then start period.
    pub entries: Vec<SessionAssignment>,
}

/// Result of a timetable query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimetableView {
    /// No timetable was ever published for the scope.
    NotGenerated,
    /// Current timetable entries.
    Ready(ViewSnapshot),
}

impl TimetableView {
    /// Entries, empty when nothing was generated.
    pub fn entries(&self) -> &[SessionAssignment] {
        match self {
            Self::NotGenerated => &[],
            Self::Ready(view) => &view.entries,
        }
    }

    /// Whether a timetable exists.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

#[derive(Debug)]
struct ScopeEntry {
    timetable: Arc<Timetable>,
    by_teacher: HashMap<String, Vec<usize>>,
    by_cohort: HashMap<String, Vec<usize>>,
    by_classroom: HashMap<String, Vec<usize>>,
    stale: AtomicBool,
}

impl ScopeEntry {
    fn new(timetable: Timetable) -> Self {
        let mut by_teacher: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_cohort: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_classroom: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, a) in timetable.assignments.iter().enumerate() {
            by_teacher.entry(a.teacher_id.clone()).or_default().push(i);
            by_cohort.entry(a.cohort_id.clone()).or_default().push(i);
            by_classroom.entry(a.classroom_id.clone()).or_default().push(i);
        }
        Self {
            timetable: Arc::new(timetable),
            by_teacher,
            by_cohort,
            by_classroom,
            stale: AtomicBool::new(false),
        }
    }

    fn view(&self, entries: Vec<SessionAssignment>) -> TimetableView {
        TimetableView::Ready(ViewSnapshot {
            scope: self.timetable.scope.clone(),
            version: self.timetable.version,
            generated_at: self.timetable.generated_at,
            stale: self.stale.load(Ordering::Acquire),
            entries,
        })
    }

    fn select(&self, positions: Option<&Vec<usize>>) -> Vec<SessionAssignment> {
        positions
            .map(|ps| ps.iter().map(|&i| self.timetable.assignments[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// Current timetable per scope.
#[derive(Debug, Default)]
pub struct TimetableIndex {
    scopes: RwLock<HashMap<String, Arc<ScopeEntry>>>,
}

impl TimetableIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the scope's timetable, assigning the next version.
    /// Returns that version.
    pub fn publish(&self, timetable: Timetable) -> u64 {
        let mut scopes = self.scopes.write();
        let version = scopes
            .get(&timetable.scope)
            .map_or(1, |entry| entry.timetable.version + 1);
        let scope = timetable.scope.clone();
        scopes.insert(scope, Arc::new(ScopeEntry::new(timetable.with_version(version))));
        version
    }

    /// Marks the scope's timetable as outdated. Returns false if nothing
    /// was published for the scope.
    pub fn mark_stale(&self, scope: &str) -> bool {
        match self.scopes.read().get(scope) {
            Some(entry) => {
                entry.stale.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Current timetable of a scope.
    pub fn current(&self, scope: &str) -> Option<Arc<Timetable>> {
        self.entry(scope).map(|e| Arc::clone(&e.timetable))
    }

    /// Published version of a scope, 0 if none.
    pub fn version(&self, scope: &str) -> u64 {
        self.entry(scope).map_or(0, |e| e.timetable.version)
    }

    /// Sessions taught by a teacher.
    pub fn teacher_view(&self, scope: &str, teacher_id: &str) -> TimetableView {
        match self.entry(scope) {
            Some(e) => e.view(e.select(e.by_teacher.get(teacher_id))),
            None => TimetableView::NotGenerated,
        }
    }

    /// Sessions attended by a cohort.
    pub fn cohort_view(&self, scope: &str, cohort_id: &str) -> TimetableView {
        match self.entry(scope) {
            Some(e) => e.view(e.select(e.by_cohort.get(cohort_id))),
            None => TimetableView::NotGenerated,
        }
    }

    /// Sessions held in a classroom.
    pub fn classroom_view(&self, scope: &str, classroom_id: &str) -> TimetableView {
        match self.entry(scope) {
            Some(e) => e.view(e.select(e.by_classroom.get(classroom_id))),
            None => TimetableView::NotGenerated,
        }
    }

    /// Whole week, optionally filtered.
    pub fn week_view(&self, scope: &str, query: &WeekQuery) -> TimetableView {
        match self.entry(scope) {
            Some(e) => {
                let entries = e
                    .timetable
                    .assignments
                    .iter()
                    .filter(|a| query.matches(a))
                    .cloned()
                    .collect();
                e.view(entries)
            }
            None => TimetableView::NotGenerated,
        }
    }

    fn entry(&self, scope: &str) -> Option<Arc<ScopeEntry>> {
        self.scopes.read().get(scope).cloned()
    }
}
