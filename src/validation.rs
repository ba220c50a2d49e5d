//! Input validation for timetabling snapshots.
//!
//! Checks structural integrity of a [`DomainSnapshot`] before a run
//! starts. Detects:
//! - Duplicate IDs
//! - Dangling references (course, cohort, teacher)
//! - Negative capacities and cohort sizes
//! - Grids and slots that cannot be represented
//! - Course rhythms that cannot fit a day
//! - Unpinned offerings whose course names no subject
//! - Non-finite preference weights and inverted week spans
//!
//! Only scoped records are checked: offerings of other semesters and
//! availability records of other scopes are ignored.

use crate::models::{DomainSnapshot, TimeSlot, WeekGrid, MAX_DAYS, MAX_PERIODS_PER_DAY};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities of one kind share the same ID.
    DuplicateId,
    /// A record references an entity that doesn't exist.
    UnknownReference,
    /// A capacity or size is negative.
    NegativeQuantity,
    /// The week grid itself is malformed.
    InvalidGrid,
    /// A slot lies outside the week grid.
    OutOfGrid,
    /// A course rhythm is empty or longer than a day.
    InvalidDuration,
    /// An unpinned offering has no subject to match teachers on.
    MissingTeacher,
    /// A preference weight is NaN or infinite.
    InvalidWeight,
    /// A week span ends before it starts.
    InvalidWeekSpan,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a snapshot for its own scope.
///
/// Checks:
/// 1. Grid: 1..=7 days, 1..=64 periods per day
/// 2. No duplicate teacher, course, cohort, classroom or offering IDs
/// 3. No negative classroom capacity or cohort size
/// 4. Every busy, unavailable, closed, blackout and preference slot fits the grid
/// 5. Every course has ≥ 1 session of 1..=periods_per_day periods
/// 6. Every scoped offering references an existing course, cohort and (if pinned) teacher
/// 7. Every unpinned offering's course names a subject
/// 8. Every preference weight is finite
/// 9. Every week span has `start_week <= end_week`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_snapshot(snapshot: &DomainSnapshot) -> ValidationResult {
    let mut errors = Vec::new();
    let grid = &snapshot.grid;

    let grid_ok = validate_grid(grid, &mut errors);

    let teacher_ids = collect_ids(
        "teacher",
        snapshot.teachers.iter().map(|t| t.id.as_str()),
        &mut errors,
    );
    let course_ids = collect_ids(
        "course",
        snapshot.courses.iter().map(|c| c.id.as_str()),
        &mut errors,
    );
    let cohort_ids = collect_ids(
        "cohort",
        snapshot.cohorts.iter().map(|c| c.id.as_str()),
        &mut errors,
    );
    collect_ids(
        "classroom",
        snapshot.classrooms.iter().map(|r| r.id.as_str()),
        &mut errors,
    );
    collect_ids(
        "offering",
        snapshot.scoped_offerings().map(|o| o.id.as_str()),
        &mut errors,
    );

    for room in &snapshot.classrooms {
        if room.capacity < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeQuantity,
                format!("Classroom '{}' has negative capacity {}", room.id, room.capacity),
            ));
        }
        if grid_ok {
            for slot in &room.unavailable {
                check_slot(grid, slot, &format!("Classroom '{}' unavailability", room.id), &mut errors);
            }
        }
    }

    for cohort in &snapshot.cohorts {
        if cohort.size < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeQuantity,
                format!("Cohort '{}' has negative size {}", cohort.id, cohort.size),
            ));
        }
        if grid_ok {
            for slot in &cohort.busy {
                check_slot(grid, slot, &format!("Cohort '{}' commitment", cohort.id), &mut errors);
            }
        }
    }

    for course in &snapshot.courses {
        if course.sessions_per_week == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!("Course '{}' has no sessions per week", course.id),
            ));
        }
        if course.session_duration == 0
            || (grid_ok && course.session_duration > grid.periods_per_day)
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!(
                    "Course '{}' session duration {} does not fit a day of {} periods",
                    course.id, course.session_duration, grid.periods_per_day
                ),
            ));
        }
    }

    for offering in snapshot.scoped_offerings() {
        let course = snapshot.courses.iter().find(|c| c.id == offering.course_id);
        if !course_ids.contains(offering.course_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!(
                    "Offering '{}' references unknown course '{}'",
                    offering.id, offering.course_id
                ),
            ));
        }
        if !cohort_ids.contains(offering.cohort_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!(
                    "Offering '{}' references unknown cohort '{}'",
                    offering.id, offering.cohort_id
                ),
            ));
        }
        match &offering.teacher_id {
            Some(teacher_id) if !teacher_ids.contains(teacher_id.as_str()) => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!(
                        "Offering '{}' references unknown teacher '{}'",
                        offering.id, teacher_id
                    ),
                ));
            }
            None if course.is_some_and(|c| c.subject.is_none()) => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MissingTeacher,
                    format!(
                        "Offering '{}' pins no teacher and course '{}' has no subject",
                        offering.id, offering.course_id
                    ),
                ));
            }
            _ => {}
        }
        if offering.weeks.start_week > offering.weeks.end_week {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeekSpan,
                format!(
                    "Offering '{}' week span {}..{} is inverted",
                    offering.id, offering.weeks.start_week, offering.weeks.end_week
                ),
            ));
        }
    }

    for blackout in snapshot.scoped_blackouts() {
        if !teacher_ids.contains(blackout.teacher_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!("Blackout references unknown teacher '{}'", blackout.teacher_id),
            ));
        }
        if grid_ok {
            check_slot(
                grid,
                &blackout.slot,
                &format!("Blackout of teacher '{}'", blackout.teacher_id),
                &mut errors,
            );
        }
    }

    for pref in snapshot.scoped_preferences() {
        if !teacher_ids.contains(pref.teacher_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!("Preference references unknown teacher '{}'", pref.teacher_id),
            ));
        }
        if !pref.weight.is_finite() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeight,
                format!(
                    "Preference of teacher '{}' has non-finite weight",
                    pref.teacher_id
                ),
            ));
        }
        if grid_ok {
            check_slot(
                grid,
                &pref.slot,
                &format!("Preference of teacher '{}'", pref.teacher_id),
                &mut errors,
            );
        }
    }

    if grid_ok {
        for slot in &grid.closed {
            check_slot(grid, slot, "Closed grid slot", &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_grid(grid: &WeekGrid, errors: &mut Vec<ValidationError>) -> bool {
    let mut ok = true;
    if grid.days == 0 || grid.days > MAX_DAYS {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidGrid,
            format!("Grid must have 1..={MAX_DAYS} days, got {}", grid.days),
        ));
        ok = false;
    }
    if grid.periods_per_day == 0 || grid.periods_per_day > MAX_PERIODS_PER_DAY {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidGrid,
            format!(
                "Grid must have 1..={MAX_PERIODS_PER_DAY} periods per day, got {}",
                grid.periods_per_day
            ),
        ));
        ok = false;
    }
    ok
}

fn collect_ids<'a>(
    label: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {label} ID: {id}"),
            ));
        }
    }
    seen
}

fn check_slot(grid: &WeekGrid, slot: &TimeSlot, what: &str, errors: &mut Vec<ValidationError>) {
    if !grid.contains(slot) {
        errors.push(ValidationError::new(
            ValidationErrorKind::OutOfGrid,
            format!(
                "{what} (day {}, periods {}..{}) lies outside the {}x{} grid",
                slot.day,
                slot.start,
                slot.end(),
                grid.days,
                grid.periods_per_day
            ),
        ));
    }
}
