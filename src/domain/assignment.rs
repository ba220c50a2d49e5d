//! Partial assignment of sessions to candidates.
//!
//! Tracks occupancy per (entity, day) as period bitmasks so clash checks
//! are a single AND. Also tracks, per offering, the committed teacher and
//! how many sessions sit on each day.

use super::{Candidate, DomainModel};
use crate::models::period_mask;

/// Mutable working copy of a timetable under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    bindings: Vec<Option<Candidate>>,
    days: usize,
    bound: usize,
    /// `[teacher * days + day]`
    teacher_busy: Vec<u64>,
    /// `[room * days + day]`
    room_busy: Vec<u64>,
    /// `[cohort * days + day]`
    cohort_busy: Vec<u64>,
    /// Teacher of the offering's bound sessions.
    offering_teacher: Vec<Option<u32>>,
    /// Bound sessions per offering.
    offering_bound: Vec<u32>,
    /// `[offering * days + day]`
    offering_day: Vec<u16>,
}

impl Assignment {
    /// Creates an empty assignment for the model.
    pub fn new(model: &DomainModel) -> Self {
        let days = model.days();
        Self {
            bindings: vec![None; model.session_count()],
            days,
            bound: 0,
            teacher_busy: vec![0; model.teachers().len() * days],
            room_busy: vec![0; model.classrooms().len() * days],
            cohort_busy: vec![0; model.cohorts().len() * days],
            offering_teacher: vec![None; model.offerings().len()],
            offering_bound: vec![0; model.offerings().len()],
            offering_day: vec![0; model.offerings().len() * days],
        }
    }

    /// Binds an unbound session.
    ///
    /// Does not check feasibility; callers consult the evaluator first.
    pub fn bind(&mut self, model: &DomainModel, s: usize, cand: Candidate) {
        debug_assert!(self.bindings[s].is_none(), "session {s} already bound");
        let spec = model.session(s);
        let offering = model.offering(spec.offering);
        let mask = period_mask(cand.start, spec.duration);
        let d = cand.day as usize;

        self.teacher_busy[cand.teacher() * self.days + d] |= mask;
        self.room_busy[cand.room() * self.days + d] |= mask;
        self.cohort_busy[offering.cohort * self.days + d] |= mask;
        self.offering_teacher[spec.offering] = Some(cand.teacher);
        self.offering_bound[spec.offering] += 1;
        self.offering_day[spec.offering * self.days + d] += 1;

        self.bindings[s] = Some(cand);
        self.bound += 1;
    }

    /// Unbinds a session, returning its previous candidate.
    pub fn unbind(&mut self, model: &DomainModel, s: usize) -> Option<Candidate> {
        let cand = self.bindings[s].take()?;
        let spec = model.session(s);
        let offering = model.offering(spec.offering);
        let mask = !period_mask(cand.start, spec.duration);
        let d = cand.day as usize;

        self.teacher_busy[cand.teacher() * self.days + d] &= mask;
        self.room_busy[cand.room() * self.days + d] &= mask;
        self.cohort_busy[offering.cohort * self.days + d] &= mask;
        self.offering_bound[spec.offering] -= 1;
        if self.offering_bound[spec.offering] == 0 {
            self.offering_teacher[spec.offering] = None;
        }
        self.offering_day[spec.offering * self.days + d] -= 1;

        self.bound -= 1;
        Some(cand)
    }

    /// Candidate bound to a session.
    #[inline]
    pub fn binding(&self, s: usize) -> Option<Candidate> {
        self.bindings[s]
    }

    /// Whether a session is bound.
    #[inline]
    pub fn is_bound(&self, s: usize) -> bool {
        self.bindings[s].is_some()
    }

    /// Number of bound sessions.
    pub fn bound_count(&self) -> usize {
        self.bound
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no sessions at all.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether every session is bound.
    pub fn is_complete(&self) -> bool {
        self.bound == self.bindings.len()
    }

    /// Occupied periods of a teacher on a day.
    #[inline]
    pub fn teacher_mask(&self, t: usize, day: u8) -> u64 {
        self.teacher_busy[t * self.days + day as usize]
    }

    /// Occupied periods of a classroom on a day.
    #[inline]
    pub fn room_mask(&self, r: usize, day: u8) -> u64 {
        self.room_busy[r * self.days + day as usize]
    }

    /// Occupied periods of a cohort on a day.
    #[inline]
    pub fn cohort_mask(&self, c: usize, day: u8) -> u64 {
        self.cohort_busy[c * self.days + day as usize]
    }

    /// Teacher committed to an offering, if any session is bound.
    #[inline]
    pub fn offering_teacher(&self, o: usize) -> Option<usize> {
        self.offering_teacher[o].map(|t| t as usize)
    }

    /// Bound sessions of an offering on a day.
    #[inline]
    pub fn offering_day_count(&self, o: usize, day: u8) -> u32 {
        self.offering_day[o * self.days + day as usize] as u32
    }

    /// Bound sessions with their candidates, by session index.
    pub fn iter_bound(&self) -> impl Iterator<Item = (usize, Candidate)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(s, b)| b.map(|c| (s, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests::small_snapshot;

    fn model() -> DomainModel {
        DomainModel::build(&small_snapshot()).unwrap()
    }

    #[test]
    fn test_bind_sets_occupancy() {
        let model = model();
        let mut a = Assignment::new(&model);
        assert!(!a.is_complete());
        assert_eq!(a.len(), 5);

        // O-MATH-K1#0: day 1, periods 2..4, hall, T2
        a.bind(&model, 1, Candidate::new(1, 2, 1, 1));
        assert!(a.is_bound(1));
        assert_eq!(a.bound_count(), 1);
        assert_eq!(a.teacher_mask(1, 1), 0b1100);
        assert_eq!(a.room_mask(1, 1), 0b1100);
        assert_eq!(a.cohort_mask(0, 1), 0b1100);
        assert_eq!(a.teacher_mask(0, 1), 0);
        assert_eq!(a.offering_teacher(1), Some(1));
        assert_eq!(a.offering_day_count(1, 1), 1);
    }

    #[test]
    fn test_unbind_restores_state() {
        let model = model();
        let empty = Assignment::new(&model);
        let mut a = empty.clone();
        a.bind(&model, 1, Candidate::new(1, 2, 1, 1));
        a.bind(&model, 2, Candidate::new(1, 0, 1, 1));
        assert_eq!(a.offering_day_count(1, 1), 2);
        assert_eq!(a.teacher_mask(1, 1), 0b1111);

        assert_eq!(a.unbind(&model, 1), Some(Candidate::new(1, 2, 1, 1)));
        assert_eq!(a.teacher_mask(1, 1), 0b0011);
        assert_eq!(a.offering_teacher(1), Some(1));

        a.unbind(&model, 2);
        assert_eq!(a, empty);
        assert_eq!(a.unbind(&model, 2), None);
    }

    #[test]
    fn test_iter_bound() {
        let model = model();
        let mut a = Assignment::new(&model);
        a.bind(&model, 3, Candidate::new(2, 0, 1, 1));
        a.bind(&model, 0, Candidate::new(0, 0, 0, 0));
        let bound: Vec<usize> = a.iter_bound().map(|(s, _)| s).collect();
        assert_eq!(bound, vec![0, 3]);
    }
}
