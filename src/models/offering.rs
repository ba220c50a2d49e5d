//! Offering model.
//!
//! An offering is one (course × cohort × semester) instance. It expands
//! into `course.sessions_per_week` sessions of `course.session_duration`
//! periods, all taught by the same teacher, which is either pinned here
//! or chosen by the solver among qualified teachers.

use serde::{Deserialize, Serialize};

use super::WeekSpan;

/// A course taught to a cohort in a semester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offering {
    /// Unique offering identifier.
    pub id: String,
    /// Course being taught.
    pub course_id: String,
    /// Cohort attending.
    pub cohort_id: String,
    /// Semester (scheduling scope).
    pub semester: String,
    /// Pinned teacher. `None` = solver picks a qualified teacher.
    #[serde(default)]
    pub teacher_id: Option<String>,
    /// Scheduling priority (higher = placed earlier on ties).
    #[serde(default)]
    pub priority: i32,
    /// Teaching weeks in which the sessions recur.
    #[serde(default)]
    pub weeks: WeekSpan,
}

impl Offering {
    /// Creates an offering with no pinned teacher.
    pub fn new(
        id: impl Into<String>,
        course_id: impl Into<String>,
        cohort_id: impl Into<String>,
        semester: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            course_id: course_id.into(),
            cohort_id: cohort_id.into(),
            semester: semester.into(),
            teacher_id: None,
            priority: 0,
            weeks: WeekSpan::default(),
        }
    }

    /// Pins the teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the teaching weeks.
    pub fn with_weeks(mut self, weeks: WeekSpan) -> Self {
        self.weeks = weeks;
        self
    }

    /// Whether the teacher is pinned.
    pub fn is_pinned(&self) -> bool {
        self.teacher_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeekPattern;

    #[test]
    fn test_offering_builder() {
        let o = Offering::new("O1", "MATH1", "CS-1", "2024-fall")
            .with_teacher("T1")
            .with_priority(5)
            .with_weeks(WeekSpan::new(1, 8).with_pattern(WeekPattern::Odd));

        assert_eq!(o.course_id, "MATH1");
        assert_eq!(o.cohort_id, "CS-1");
        assert!(o.is_pinned());
        assert_eq!(o.priority, 5);
        assert!(o.weeks.includes(3));
        assert!(!o.weeks.includes(4));
    }

    #[test]
    fn test_unpinned_by_default() {
        let o = Offering::new("O1", "MATH1", "CS-1", "2024-fall");
        assert!(!o.is_pinned());
        assert!(o.teacher_id.is_none());
    }
}
