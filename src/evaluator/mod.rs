//! Constraint evaluation and scoring.
//!
//! Hard constraints are answered per candidate against an [`Assignment`]
//! in constant time. The soft objective is
//!
//! ```text
//! score = Σ_sessions Σ_covered periods scale × preference(teacher, day, period)
//!       − spread_penalty × Σ_offerings Σ_days C(n_od, 2)
//! ```
//!
//! where `n_od` counts the offering's sessions on day `d`. Because the
//! spread term is pairwise, binding one session changes the score by its
//! own preference sum minus `spread_penalty` times the number of sibling
//! sessions already on that day. [`ConstraintEvaluator::contribution`]
//! returns exactly that delta, which keeps local-search moves O(1).
//!
//! # Reference
//! Burke & Petrovic (2002), "Recent research directions in automated timetabling"

mod audit;

pub use audit::{audit, audited};

use crate::config::ScoreWeights;
use crate::domain::{Assignment, Candidate, DomainModel};
use crate::models::{period_mask, TimeSlot};

/// Hard-constraint checks and soft scoring over one model.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintEvaluator<'a> {
    model: &'a DomainModel,
    weights: &'a ScoreWeights,
}

impl<'a> ConstraintEvaluator<'a> {
    /// Creates an evaluator.
    pub fn new(model: &'a DomainModel, weights: &'a ScoreWeights) -> Self {
        Self { model, weights }
    }

    /// The model under evaluation.
    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    /// Whether a candidate respects every constraint that does not depend
    /// on other sessions: grid, block starts, closures, cohort
    /// commitments, teacher blackouts and eligibility, room fit and
    /// availability.
    pub fn statically_feasible(&self, s: usize, cand: &Candidate) -> bool {
        let model = self.model;
        let spec = model.session(s);
        let o = spec.offering;
        let offering = model.offering(o);
        let (t, r) = (cand.teacher(), cand.room());

        if (cand.day as usize) >= model.days()
            || t >= model.teachers().len()
            || r >= model.classrooms().len()
            || !model.start_allowed(spec.duration, cand.start)
        {
            return false;
        }
        let mask = period_mask(cand.start, spec.duration);
        let blocked = model.grid_closed_mask(cand.day)
            | model.cohort_busy_mask(offering.cohort, cand.day)
            | model.room_closed_mask(r, cand.day)
            | model.teacher_blackout_mask(t, cand.day);

        blocked & mask == 0 && model.room_fits(o, r) && model.teacher_eligible(o, t)
    }

    /// Whether binding the (currently unbound) session `s` to `cand` keeps
    /// every hard constraint satisfied.
    ///
    /// On top of the static checks: no teacher, classroom or cohort
    /// overlap with bound sessions, and every session of an offering
    /// shares one teacher.
    pub fn feasible(&self, assignment: &Assignment, s: usize, cand: &Candidate) -> bool {
        if !self.statically_feasible(s, cand) {
            return false;
        }
        self.free_of_clashes(assignment, s, cand)
    }

    /// Dynamic part of [`Self::feasible`], for candidates drawn from the
    /// session's static domain.
    #[inline]
    pub fn free_of_clashes(&self, assignment: &Assignment, s: usize, cand: &Candidate) -> bool {
        let spec = self.model.session(s);
        let o = spec.offering;
        let cohort = self.model.offering(o).cohort;
        let mask = period_mask(cand.start, spec.duration);

        let occupied = assignment.teacher_mask(cand.teacher(), cand.day)
            | assignment.room_mask(cand.room(), cand.day)
            | assignment.cohort_mask(cohort, cand.day);
        if occupied & mask != 0 {
            return false;
        }
        assignment
            .offering_teacher(o)
            .map_or(true, |t| t == cand.teacher())
    }

    /// Scaled preference weight of a teacher over a slot.
    pub fn preference_weight(&self, t: usize, slot: &TimeSlot) -> f64 {
        self.weights.preference_scale * self.model.preference_over(t, slot)
    }

    /// Score change from binding the unbound session `s` to `cand`.
    pub fn contribution(&self, assignment: &Assignment, s: usize, cand: &Candidate) -> f64 {
        let spec = self.model.session(s);
        let siblings = assignment.offering_day_count(spec.offering, cand.day);
        self.preference_weight(cand.teacher(), &cand.slot(spec.duration))
            - self.weights.spread_penalty * siblings as f64
    }

    /// Full objective of an assignment (partial assignments count only
    /// their bound sessions).
    pub fn score(&self, assignment: &Assignment) -> f64 {
        let model = self.model;
        let preference: f64 = assignment
            .iter_bound()
            .map(|(s, cand)| {
                self.preference_weight(cand.teacher(), &cand.slot(model.session(s).duration))
            })
            .sum();

        let mut pairs = 0u64;
        for o in 0..model.offerings().len() {
            for day in 0..model.grid().days {
                let n = assignment.offering_day_count(o, day) as u64;
                pairs += n * n.saturating_sub(1) / 2;
            }
        }
        preference - self.weights.spread_penalty * pairs as f64
    }
}
