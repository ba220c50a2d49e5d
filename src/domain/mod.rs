//! Compiled domain model for one generation run.
//!
//! [`DomainModel::build`] validates a [`DomainSnapshot`], filters it to
//! its scope, and compiles it into index-addressed tables the search
//! reads millions of times:
//!
//! - per-day bitmasks for teacher blackouts, cohort commitments,
//!   classroom unavailability and grid closures
//! - a dense per-teacher preference table
//! - each session's static candidate domain
//!
//! The model is immutable once built; runs share it behind an `Arc`.
//!
//! # Candidate Order
//! Static domains list candidates by day, then start period, then
//! classroom ID, then teacher ID, all ascending. The feasibility search
//! tries values in exactly this order.

mod assignment;

pub use assignment::Assignment;

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::models::{
    period_mask, Classroom, Cohort, Course, DomainSnapshot, SessionAssignment, SessionKey,
    Teacher, TimeSlot, WeekGrid, WeekSpan,
};
use crate::validation::validate_snapshot;

/// One value a session can take: a start cell, a classroom and a teacher.
///
/// Indices refer to the owning [`DomainModel`]. The slot length is the
/// session's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Day index.
    pub day: u8,
    /// First period.
    pub start: u8,
    /// Classroom index.
    pub room: u32,
    /// Teacher index.
    pub teacher: u32,
}

impl Candidate {
    /// Creates a candidate.
    pub fn new(day: u8, start: u8, room: usize, teacher: usize) -> Self {
        Self {
            day,
            start,
            room: room as u32,
            teacher: teacher as u32,
        }
    }

    /// Slot covered by a session of `len` periods.
    #[inline]
    pub fn slot(&self, len: u8) -> TimeSlot {
        TimeSlot::new(self.day, self.start, len)
    }

    /// Classroom index.
    #[inline]
    pub fn room(&self) -> usize {
        self.room as usize
    }

    /// Teacher index.
    #[inline]
    pub fn teacher(&self) -> usize {
        self.teacher as usize
    }
}

/// An offering resolved against the model's entity tables.
#[derive(Debug, Clone)]
pub struct OfferingSpec {
    /// Offering identifier.
    pub id: String,
    /// Course index.
    pub course: usize,
    /// Cohort index.
    pub cohort: usize,
    /// Eligible teacher indices, ascending by teacher ID.
    pub teachers: Vec<usize>,
    /// Whether the teacher was pinned by the caller.
    pub pinned: bool,
    /// Scheduling priority (higher first on ties).
    pub priority: i32,
    /// Teaching weeks.
    pub weeks: WeekSpan,
    /// Fitting classroom indices, ascending by classroom ID.
    pub rooms: Vec<usize>,
    /// Session indices of this offering, by occurrence.
    pub sessions: Vec<usize>,
}

/// A schedulable session.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    /// Session identity.
    pub key: SessionKey,
    /// Offering index.
    pub offering: usize,
    /// Periods per session.
    pub duration: u8,
}

/// Read-only, indexed view of one scope's entities.
#[derive(Debug, Clone)]
pub struct DomainModel {
    scope: String,
    grid: WeekGrid,
    teachers: Vec<Teacher>,
    courses: Vec<Course>,
    cohorts: Vec<Cohort>,
    classrooms: Vec<Classroom>,
    offerings: Vec<OfferingSpec>,
    sessions: Vec<SessionSpec>,
    teacher_index: HashMap<String, usize>,
    cohort_index: HashMap<String, usize>,
    classroom_index: HashMap<String, usize>,
    session_index: HashMap<SessionKey, usize>,
    /// Allowed start periods as a bitmask, keyed by duration.
    start_masks: BTreeMap<u8, u64>,
    /// `[day]`
    grid_closed: Vec<u64>,
    /// `[teacher * days + day]`
    teacher_blackout: Vec<u64>,
    /// `[cohort * days + day]`
    cohort_busy: Vec<u64>,
    /// `[room * days + day]`
    room_closed: Vec<u64>,
    /// `[teacher * cells + day * periods_per_day + period]`
    preferences: Vec<f64>,
    /// `[offering * rooms + room]`
    room_fits: Vec<bool>,
    /// Static candidate domain per session.
    domains: Vec<Vec<Candidate>>,
}

impl DomainModel {
    /// Builds the model for the snapshot's scope.
    ///
    /// # Errors
    ///
    /// Returns `TimetableError::InvalidInput` if the snapshot fails validation.
    pub fn build(snapshot: &DomainSnapshot) -> Result<Self> {
        validate_snapshot(snapshot)?;

        let grid = snapshot.grid.clone();
        let days = grid.days as usize;
        let ppd = grid.periods_per_day as usize;
        let cells = grid.cell_count();

        let mut teachers = snapshot.teachers.clone();
        teachers.sort_by(|a, b| a.id.cmp(&b.id));
        let mut classrooms = snapshot.classrooms.clone();
        classrooms.sort_by(|a, b| a.id.cmp(&b.id));
        let cohorts = snapshot.cohorts.clone();
        let courses = snapshot.courses.clone();

        let teacher_index = index_by(&teachers, |t| &t.id);
        let classroom_index = index_by(&classrooms, |r| &r.id);
        let cohort_index = index_by(&cohorts, |c| &c.id);
        let course_index = index_by(&courses, |c| &c.id);

        let mut scoped: Vec<_> = snapshot.scoped_offerings().collect();
        scoped.sort_by(|a, b| a.id.cmp(&b.id));

        let mut offerings = Vec::with_capacity(scoped.len());
        let mut sessions = Vec::new();
        for (o, offering) in scoped.into_iter().enumerate() {
            // References were checked by validation.
            let course = course_index[&offering.course_id];
            let cohort = cohort_index[&offering.cohort_id];
            let course_ref = &courses[course];

            let teacher_ids: Vec<usize> = match &offering.teacher_id {
                Some(id) => vec![teacher_index[id]],
                None => {
                    let subject = course_ref.subject.as_deref().unwrap_or_default();
                    (0..teachers.len())
                        .filter(|&t| teachers[t].is_qualified(subject))
                        .collect()
                }
            };

            let rooms: Vec<usize> = (0..classrooms.len())
                .filter(|&r| classrooms[r].fits(cohorts[cohort].size, &course_ref.required_features))
                .collect();

            let mut session_ids = Vec::with_capacity(course_ref.sessions_per_week as usize);
            for occurrence in 0..course_ref.sessions_per_week {
                session_ids.push(sessions.len());
                sessions.push(SessionSpec {
                    key: SessionKey::new(offering.id.clone(), occurrence),
                    offering: o,
                    duration: course_ref.session_duration,
                });
            }

            offerings.push(OfferingSpec {
                id: offering.id.clone(),
                course,
                cohort,
                teachers: teacher_ids,
                pinned: offering.is_pinned(),
                priority: offering.priority,
                weeks: offering.weeks,
                rooms,
                sessions: session_ids,
            });
        }

        let session_index = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key.clone(), i))
            .collect();

        let mut start_masks = BTreeMap::new();
        for course in &courses {
            start_masks.entry(course.session_duration).or_insert_with(|| {
                grid.allowed_starts(course.session_duration)
                    .into_iter()
                    .fold(0u64, |acc, s| acc | (1u64 << s))
            });
        }

        let grid_closed: Vec<u64> = (0..grid.days).map(|d| grid.closed_mask(d)).collect();

        let mut teacher_blackout = vec![0u64; teachers.len() * days];
        for b in snapshot.scoped_blackouts() {
            let t = teacher_index[&b.teacher_id];
            teacher_blackout[t * days + b.slot.day as usize] |= b.slot.mask();
        }

        let mut cohort_busy = vec![0u64; cohorts.len() * days];
        for (c, cohort) in cohorts.iter().enumerate() {
            for slot in &cohort.busy {
                cohort_busy[c * days + slot.day as usize] |= slot.mask();
            }
        }

        let mut room_closed = vec![0u64; classrooms.len() * days];
        for (r, room) in classrooms.iter().enumerate() {
            for slot in &room.unavailable {
                room_closed[r * days + slot.day as usize] |= slot.mask();
            }
        }

        let mut preferences = vec![0.0; teachers.len() * cells];
        for p in snapshot.scoped_preferences() {
            let t = teacher_index[&p.teacher_id];
            for period in p.slot.periods() {
                preferences[t * cells + p.slot.day as usize * ppd + period as usize] += p.weight;
            }
        }

        let mut room_fits = vec![false; offerings.len() * classrooms.len()];
        for (o, spec) in offerings.iter().enumerate() {
            for &r in &spec.rooms {
                room_fits[o * classrooms.len() + r] = true;
            }
        }

        let mut model = Self {
            scope: snapshot.scope.clone(),
            grid,
            teachers,
            courses,
            cohorts,
            classrooms,
            offerings,
            sessions,
            teacher_index,
            cohort_index,
            classroom_index,
            session_index,
            start_masks,
            grid_closed,
            teacher_blackout,
            cohort_busy,
            room_closed,
            preferences,
            room_fits,
            domains: Vec::new(),
        };
        model.domains = (0..model.sessions.len())
            .map(|s| model.compute_domain(s))
            .collect();
        Ok(model)
    }

    /// Static candidates of a session: every value consistent with the
    /// grid, blackouts, commitments, room fit and teacher eligibility.
    fn compute_domain(&self, s: usize) -> Vec<Candidate> {
        let spec = &self.sessions[s];
        let offering = &self.offerings[spec.offering];
        let mut domain = Vec::new();
        for day in 0..self.grid.days {
            let closed = self.grid_closed[day as usize]
                | self.cohort_busy_mask(offering.cohort, day);
            for start in self.grid.allowed_starts(spec.duration) {
                let mask = period_mask(start, spec.duration);
                if closed & mask != 0 {
                    continue;
                }
                for &room in &offering.rooms {
                    if self.room_closed_mask(room, day) & mask != 0 {
                        continue;
                    }
                    for &teacher in &offering.teachers {
                        if self.teacher_blackout_mask(teacher, day) & mask != 0 {
                            continue;
                        }
                        domain.push(Candidate::new(day, start, room, teacher));
                    }
                }
            }
        }
        domain
    }

    /// Scope of the run.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Week grid.
    pub fn grid(&self) -> &WeekGrid {
        &self.grid
    }

    /// Number of teaching days.
    #[inline]
    pub fn days(&self) -> usize {
        self.grid.days as usize
    }

    /// Sessions to place.
    pub fn sessions(&self) -> &[SessionSpec] {
        &self.sessions
    }

    /// Session by index.
    #[inline]
    pub fn session(&self, s: usize) -> &SessionSpec {
        &self.sessions[s]
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Resolved offerings, ascending by ID.
    pub fn offerings(&self) -> &[OfferingSpec] {
        &self.offerings
    }

    /// Offering by index.
    #[inline]
    pub fn offering(&self, o: usize) -> &OfferingSpec {
        &self.offerings[o]
    }

    /// Offering owning a session.
    #[inline]
    pub fn offering_of(&self, s: usize) -> &OfferingSpec {
        &self.offerings[self.sessions[s].offering]
    }

    /// Teachers, ascending by ID.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Teacher by index.
    pub fn teacher(&self, t: usize) -> &Teacher {
        &self.teachers[t]
    }

    /// Classrooms, ascending by ID.
    pub fn classrooms(&self) -> &[Classroom] {
        &self.classrooms
    }

    /// Classroom by index.
    pub fn classroom(&self, r: usize) -> &Classroom {
        &self.classrooms[r]
    }

    /// Cohorts.
    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    /// Cohort by index.
    pub fn cohort(&self, c: usize) -> &Cohort {
        &self.cohorts[c]
    }

    /// Course by index.
    pub fn course(&self, c: usize) -> &Course {
        &self.courses[c]
    }

    /// Finds a teacher index by ID.
    pub fn find_teacher(&self, id: &str) -> Option<usize> {
        self.teacher_index.get(id).copied()
    }

    /// Finds a classroom index by ID.
    pub fn find_classroom(&self, id: &str) -> Option<usize> {
        self.classroom_index.get(id).copied()
    }

    /// Finds a cohort index by ID.
    pub fn find_cohort(&self, id: &str) -> Option<usize> {
        self.cohort_index.get(id).copied()
    }

    /// Finds a session index by key.
    pub fn find_session(&self, key: &SessionKey) -> Option<usize> {
        self.session_index.get(key).copied()
    }

    /// Static candidate domain of a session.
    #[inline]
    pub fn domain(&self, s: usize) -> &[Candidate] {
        &self.domains[s]
    }

    /// Whether a session of `duration` periods may start at `start`.
    #[inline]
    pub fn start_allowed(&self, duration: u8, start: u8) -> bool {
        start < 64
            && self
                .start_masks
                .get(&duration)
                .is_some_and(|m| m & (1u64 << start) != 0)
    }

    /// Closed periods of the grid on a day.
    #[inline]
    pub fn grid_closed_mask(&self, day: u8) -> u64 {
        self.grid_closed[day as usize]
    }

    /// Blacked-out periods of a teacher on a day.
    #[inline]
    pub fn teacher_blackout_mask(&self, t: usize, day: u8) -> u64 {
        self.teacher_blackout[t * self.days() + day as usize]
    }

    /// Committed periods of a cohort on a day.
    #[inline]
    pub fn cohort_busy_mask(&self, c: usize, day: u8) -> u64 {
        self.cohort_busy[c * self.days() + day as usize]
    }

    /// Unavailable periods of a classroom on a day.
    #[inline]
    pub fn room_closed_mask(&self, r: usize, day: u8) -> u64 {
        self.room_closed[r * self.days() + day as usize]
    }

    /// Whether a classroom fits an offering's cohort size and features.
    #[inline]
    pub fn room_fits(&self, o: usize, r: usize) -> bool {
        self.room_fits[o * self.classrooms.len() + r]
    }

    /// Whether a teacher may teach an offering.
    #[inline]
    pub fn teacher_eligible(&self, o: usize, t: usize) -> bool {
        self.offerings[o].teachers.binary_search(&t).is_ok()
    }

    /// Raw preference weight of a teacher for one cell.
    #[inline]
    pub fn preference(&self, t: usize, day: u8, period: u8) -> f64 {
        let cells = self.grid.cell_count();
        let ppd = self.grid.periods_per_day as usize;
        self.preferences[t * cells + day as usize * ppd + period as usize]
    }

    /// Sum of raw preference weights of a teacher over a slot.
    pub fn preference_over(&self, t: usize, slot: &TimeSlot) -> f64 {
        slot.periods()
            .filter(|&p| p < self.grid.periods_per_day)
            .map(|p| self.preference(t, slot.day, p))
            .sum()
    }

    /// Converts the bound part of an assignment into session bindings.
    pub fn materialize(&self, assignment: &Assignment) -> Vec<SessionAssignment> {
        assignment
            .iter_bound()
            .map(|(s, cand)| {
                let spec = &self.sessions[s];
                let offering = &self.offerings[spec.offering];
                SessionAssignment {
                    session: spec.key.clone(),
                    course_id: self.courses[offering.course].id.clone(),
                    cohort_id: self.cohorts[offering.cohort].id.clone(),
                    teacher_id: self.teachers[cand.teacher()].id.clone(),
                    classroom_id: self.classrooms[cand.room()].id.clone(),
                    slot: cand.slot(spec.duration),
                    weeks: offering.weeks,
                }
            })
            .collect()
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).clone(), i))
        .collect()
}
