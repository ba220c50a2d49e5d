//! Entity snapshot handed over by the CRUD layer.
//!
//! The engine only ever reads snapshots; entity records are owned and
//! persisted elsewhere. One snapshot describes one scheduling scope.

use serde::{Deserialize, Serialize};

use super::{BlackoutWindow, Classroom, Cohort, Course, Offering, Preference, Teacher, WeekGrid};

/// Read-only copy of every entity a generation run needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainSnapshot {
    /// Scheduling scope (e.g. semester). Offerings of other semesters are ignored.
    pub scope: String,
    /// Teaching week grid.
    #[serde(default)]
    pub grid: WeekGrid,
    /// Teachers.
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    /// Courses.
    #[serde(default)]
    pub courses: Vec<Course>,
    /// Cohorts.
    #[serde(default)]
    pub cohorts: Vec<Cohort>,
    /// Classrooms.
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    /// Offerings (all semesters).
    #[serde(default)]
    pub offerings: Vec<Offering>,
    /// Teacher blackout windows (all scopes).
    #[serde(default)]
    pub blackouts: Vec<BlackoutWindow>,
    /// Teacher preferences (all scopes).
    #[serde(default)]
    pub preferences: Vec<Preference>,
}

impl DomainSnapshot {
    /// Creates an empty snapshot for a scope on the default grid.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Self::default()
        }
    }

    /// Sets the week grid.
    pub fn with_grid(mut self, grid: WeekGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Adds a teacher.
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Adds a course.
    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.push(course);
        self
    }

    /// Adds a cohort.
    pub fn with_cohort(mut self, cohort: Cohort) -> Self {
        self.cohorts.push(cohort);
        self
    }

    /// Adds a classroom.
    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.classrooms.push(classroom);
        self
    }

    /// Adds an offering.
    pub fn with_offering(mut self, offering: Offering) -> Self {
        self.offerings.push(offering);
        self
    }

    /// Adds a blackout window.
    pub fn with_blackout(mut self, blackout: BlackoutWindow) -> Self {
        self.blackouts.push(blackout);
        self
    }

    /// Adds a preference.
    pub fn with_preference(mut self, preference: Preference) -> Self {
        self.preferences.push(preference);
        self
    }

    /// Offerings belonging to this snapshot's scope.
    pub fn scoped_offerings(&self) -> impl Iterator<Item = &Offering> {
        self.offerings.iter().filter(move |o| o.semester == self.scope)
    }

    /// Blackout windows applying to this snapshot's scope.
    pub fn scoped_blackouts(&self) -> impl Iterator<Item = &BlackoutWindow> {
        self.blackouts.iter().filter(move |b| b.applies_to(&self.scope))
    }

    /// Preferences applying to this snapshot's scope.
    pub fn scoped_preferences(&self) -> impl Iterator<Item = &Preference> {
        self.preferences
            .iter()
            .filter(move |p| p.applies_to(&self.scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlot;

    #[test]
    fn test_scope_filtering() {
        let snap = DomainSnapshot::new("fall")
            .with_offering(Offering::new("O1", "C1", "K1", "fall"))
            .with_offering(Offering::new("O2", "C1", "K1", "spring"))
            .with_blackout(BlackoutWindow::new("T1", TimeSlot::single(0, 0)))
            .with_blackout(BlackoutWindow::new("T1", TimeSlot::single(0, 1)).in_scope("spring"))
            .with_preference(Preference::new("T1", TimeSlot::single(1, 0), 2.0).in_scope("fall"));

        let offerings: Vec<&str> = snap.scoped_offerings().map(|o| o.id.as_str()).collect();
        assert_eq!(offerings, vec!["O1"]);
        assert_eq!(snap.scoped_blackouts().count(), 1);
        assert_eq!(snap.scoped_preferences().count(), 1);
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snap = DomainSnapshot::new("fall")
            .with_teacher(Teacher::new("T1").with_qualification("math"))
            .with_course(Course::new("C1", 2, 2).with_subject("math"))
            .with_cohort(Cohort::new("K1", 30))
            .with_classroom(Classroom::new("R1", 40));

        let json = serde_json::to_string(&snap).unwrap();
        let back: DomainSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scope, "fall");
        assert_eq!(back.teachers.len(), 1);
        assert_eq!(back.grid, WeekGrid::default());
    }
}
