//! Timetable (solution) model.
//!
//! A timetable is the frozen result of one generation run: every
//! session of every offering bound to a (slot, classroom, teacher)
//! triple. It may carry constraint violations found by the audit.
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling"

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{TimeSlot, WeekSpan};

/// Identity of one schedulable session: the `occurrence`-th weekly
/// meeting of an offering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    /// Owning offering.
    pub offering_id: String,
    /// Weekly occurrence index (0-based).
    pub occurrence: u32,
}

impl SessionKey {
    /// Creates a session key.
    pub fn new(offering_id: impl Into<String>, occurrence: u32) -> Self {
        Self {
            offering_id: offering_id.into(),
            occurrence,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.offering_id, self.occurrence)
    }
}

/// A session bound to a slot, classroom and teacher.
///
/// Course and cohort are denormalized for query convenience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAssignment {
    /// Session identity.
    pub session: SessionKey,
    /// Course taught.
    pub course_id: String,
    /// Cohort attending.
    pub cohort_id: String,
    /// Assigned teacher.
    pub teacher_id: String,
    /// Assigned classroom.
    pub classroom_id: String,
    /// Weekly slot.
    pub slot: TimeSlot,
    /// Teaching weeks the slot recurs in.
    pub weeks: WeekSpan,
}

/// Whether a timetable satisfies every hard constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeasibilityStatus {
    /// Complete and free of hard violations.
    Feasible,
    /// Incomplete or violating at least one hard constraint.
    Infeasible,
}

/// A frozen timetable for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timetable {
    /// Scope (e.g. semester) the timetable was generated for.
    pub scope: String,
    /// Version within the scope, assigned on publication.
    pub version: u64,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Feasibility tag.
    pub status: FeasibilityStatus,
    /// Objective value (preference total minus spread penalties).
    pub score: f64,
    /// Session bindings, sorted by day, start period, then session.
    pub assignments: Vec<SessionAssignment>,
    /// Hard-constraint violations detected by the audit.
    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// A hard-constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (teacher, classroom, cohort, or session).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of hard-constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two sessions share a teacher at overlapping times.
    TeacherClash,
    /// Two sessions share a classroom at overlapping times.
    ClassroomClash,
    /// Two sessions of one cohort overlap.
    CohortClash,
    /// Session inside a blackout window of its teacher.
    Blackout,
    /// Classroom too small for the cohort.
    CapacityExceeded,
    /// Classroom lacks a feature the course requires.
    MissingFeature,
    /// Session overlaps a cohort commitment, a closed grid slot, or a
    /// classroom unavailability.
    Unavailable,
    /// Session outside the week grid or off its block starts.
    OutsideGrid,
    /// Session of an offering never bound.
    Unassigned,
    /// Session bound more than once, or unknown to the model.
    UnknownSession,
    /// Sessions of one offering taught by different teachers, or by an
    /// ineligible teacher.
    TeacherMismatch,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

impl Timetable {
    /// Freezes bindings into a feasible, unversioned timetable.
    ///
    /// Assignments are sorted by day, start period, then session key.
    pub fn new(scope: impl Into<String>, mut assignments: Vec<SessionAssignment>, score: f64) -> Self {
        assignments.sort_by(|a, b| {
            (a.slot.day, a.slot.start, &a.session).cmp(&(b.slot.day, b.slot.start, &b.session))
        });
        Self {
            scope: scope.into(),
            version: 0,
            generated_at: Utc::now(),
            status: FeasibilityStatus::Feasible,
            score,
            assignments,
            violations: Vec::new(),
        }
    }

    /// Sets the version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Records audit violations; any violation makes the timetable infeasible.
    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        if !violations.is_empty() {
            self.status = FeasibilityStatus::Infeasible;
        }
        self.violations = violations;
        self
    }

    /// Whether the timetable is complete and free of hard violations.
    pub fn is_feasible(&self) -> bool {
        self.status == FeasibilityStatus::Feasible && self.violations.is_empty()
    }

    /// Finds the binding of a session.
    pub fn assignment_for_session(&self, session: &SessionKey) -> Option<&SessionAssignment> {
        self.assignments.iter().find(|a| &a.session == session)
    }

    /// Returns all bindings of a teacher.
    pub fn assignments_for_teacher(&self, teacher_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.teacher_id == teacher_id)
            .collect()
    }

    /// Returns all bindings of a cohort.
    pub fn assignments_for_cohort(&self, cohort_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.cohort_id == cohort_id)
            .collect()
    }

    /// Returns all bindings in a classroom.
    pub fn assignments_for_classroom(&self, classroom_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.classroom_id == classroom_id)
            .collect()
    }

    /// Periods booked per classroom.
    pub fn classroom_loads(&self) -> HashMap<String, u32> {
        let mut loads: HashMap<String, u32> = HashMap::new();
        for a in &self.assignments {
            *loads.entry(a.classroom_id.clone()).or_insert(0) += a.slot.len as u32;
        }
        loads
    }

    /// Number of bound sessions.
    pub fn session_count(&self) -> usize {
        self.assignments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(offering: &str, occ: u32, teacher: &str, room: &str, slot: TimeSlot) -> SessionAssignment {
        SessionAssignment {
            session: SessionKey::new(offering, occ),
            course_id: format!("C-{offering}"),
            cohort_id: "K1".into(),
            teacher_id: teacher.into(),
            classroom_id: room.into(),
            slot,
            weeks: WeekSpan::default(),
        }
    }

    fn sample_timetable() -> Timetable {
        Timetable::new(
            "S1",
            vec![
                binding("O2", 0, "T2", "R1", TimeSlot::new(1, 0, 2)),
                binding("O1", 1, "T1", "R2", TimeSlot::new(0, 4, 2)),
                binding("O1", 0, "T1", "R1", TimeSlot::new(0, 0, 2)),
            ],
            3.5,
        )
    }

    #[test]
    fn test_timetable_sorted() {
        let t = sample_timetable();
        let keys: Vec<String> = t.assignments.iter().map(|a| a.session.to_string()).collect();
        assert_eq!(keys, vec!["O1#0", "O1#1", "O2#0"]);
        assert_eq!(t.version, 0);
        assert!(t.is_feasible());
    }

    #[test]
    fn test_lookups() {
        let t = sample_timetable();
        assert_eq!(t.assignments_for_teacher("T1").len(), 2);
        assert_eq!(t.assignments_for_classroom("R1").len(), 2);
        assert_eq!(t.assignments_for_cohort("K1").len(), 3);
        assert_eq!(t.assignments_for_cohort("K9").len(), 0);

        let a = t.assignment_for_session(&SessionKey::new("O1", 1)).unwrap();
        assert_eq!(a.classroom_id, "R2");
        assert!(t.assignment_for_session(&SessionKey::new("O9", 0)).is_none());
    }

    #[test]
    fn test_classroom_loads() {
        let t = sample_timetable();
        let loads = t.classroom_loads();
        assert_eq!(loads["R1"], 4);
        assert_eq!(loads["R2"], 2);
    }

    #[test]
    fn test_violations_mark_infeasible() {
        let t = sample_timetable().with_violations(vec![Violation::new(
            ViolationType::TeacherClash,
            "T1",
            "overlap",
        )]);
        assert_eq!(t.status, FeasibilityStatus::Infeasible);
        assert!(!t.is_feasible());
    }

    #[test]
    fn test_session_key_display() {
        assert_eq!(SessionKey::new("MATH-A", 2).to_string(), "MATH-A#2");
    }
}
