//! Feasibility phase: backtracking with forward checking.
//!
//! The search keeps an explicit stack of choice points instead of
//! recursing, so deep instances cannot overflow the worker's stack.
//! Each frame owns the candidates it has not tried yet and a trail of the
//! live domains its current binding pruned; undoing a binding restores
//! exactly those domains.

use std::time::Instant;

use super::{past, RunSignals, SearchStats};
use crate::domain::{Assignment, Candidate, DomainModel};
use crate::evaluator::ConstraintEvaluator;

/// Deadline is polled once per this many iterations.
const CLOCK_INTERVAL: u64 = 256;

pub(crate) enum FeasibilityOutcome {
    Found(Assignment),
    Infeasible,
    TimedOut,
    Cancelled,
}

enum Stop {
    TimedOut,
    Cancelled,
}

enum Step {
    Bound,
    Exhausted,
    Stop(Stop),
}

struct Frame {
    session: usize,
    /// Untried candidate indices, next on top.
    remaining: Vec<u32>,
    /// Live domains replaced while propagating the current binding.
    trail: Vec<(usize, Vec<u32>)>,
    bound: bool,
}

pub(crate) struct Backtracker<'a> {
    model: &'a DomainModel,
    evaluator: ConstraintEvaluator<'a>,
    signals: &'a RunSignals,
    deadline: Option<Instant>,
    max_nodes: u64,
    assignment: Assignment,
    /// Indices into each session's static domain still consistent with
    /// the bound sessions.
    live: Vec<Vec<u32>>,
    stats: SearchStats,
    ticks: u64,
}

impl<'a> Backtracker<'a> {
    pub(crate) fn new(
        model: &'a DomainModel,
        evaluator: ConstraintEvaluator<'a>,
        signals: &'a RunSignals,
        deadline: Option<Instant>,
        max_nodes: u64,
    ) -> Self {
        let live = (0..model.session_count())
            .map(|s| (0..model.domain(s).len() as u32).collect())
            .collect();
        Self {
            model,
            evaluator,
            signals,
            deadline,
            max_nodes,
            assignment: Assignment::new(model),
            live,
            stats: SearchStats::default(),
            ticks: 0,
        }
    }

    pub(crate) fn run(mut self) -> (FeasibilityOutcome, SearchStats) {
        let outcome = self.search();
        (outcome, self.stats)
    }

    fn search(&mut self) -> FeasibilityOutcome {
        if let Some(stop) = self.check_stop() {
            return stop.into();
        }
        if self.model.session_count() == 0 {
            return FeasibilityOutcome::Found(self.assignment.clone());
        }
        if self.live.iter().any(|d| d.is_empty()) {
            return FeasibilityOutcome::Infeasible;
        }

        let mut stack = Vec::new();
        if let Some(first) = self.select() {
            stack.push(self.open(first));
        }

        while let Some(mut frame) = stack.pop() {
            match self.advance(&mut frame) {
                Step::Bound => {
                    stack.push(frame);
                    let bound = self.assignment.bound_count();
                    if bound > self.stats.max_depth {
                        self.stats.max_depth = bound;
                        self.signals
                            .report(0.5 * bound as f64 / self.model.session_count() as f64);
                    }
                    match self.select() {
                        Some(next) => stack.push(self.open(next)),
                        None => return FeasibilityOutcome::Found(self.assignment.clone()),
                    }
                }
                Step::Exhausted => self.stats.backtracks += 1,
                Step::Stop(stop) => return stop.into(),
            }
        }
        FeasibilityOutcome::Infeasible
    }

    fn open(&self, session: usize) -> Frame {
        Frame {
            session,
            remaining: self.live[session].iter().rev().copied().collect(),
            trail: Vec::new(),
            bound: false,
        }
    }

    /// Most-constrained unbound session: fewest live candidates, then
    /// highest offering priority, then lowest session key.
    fn select(&self) -> Option<usize> {
        (0..self.model.session_count())
            .filter(|&s| !self.assignment.is_bound(s))
            .min_by_key(|&s| {
                let priority = self.model.offering_of(s).priority;
                (self.live[s].len(), std::cmp::Reverse(priority), s)
            })
    }

    /// Moves a frame to its next viable candidate.
    fn advance(&mut self, frame: &mut Frame) -> Step {
        if frame.bound {
            self.undo(frame);
        }
        let s = frame.session;
        while let Some(i) = frame.remaining.pop() {
            if let Some(stop) = self.check_stop() {
                return Step::Stop(stop);
            }
            self.stats.nodes += 1;

            let cand = self.model.domain(s)[i as usize];
            if !self.evaluator.free_of_clashes(&self.assignment, s, &cand) {
                continue;
            }
            self.assignment.bind(self.model, s, cand);
            frame.bound = true;
            if self.propagate(s, cand, &mut frame.trail) {
                return Step::Bound;
            }
            self.undo(frame);
        }
        Step::Exhausted
    }

    /// Prunes the live domains of unbound sessions after binding `s`.
    /// Returns false on a wipeout.
    fn propagate(&mut self, s: usize, cand: Candidate, trail: &mut Vec<(usize, Vec<u32>)>) -> bool {
        let offering = self.model.session(s).offering;
        for t in 0..self.model.session_count() {
            if self.assignment.is_bound(t) {
                continue;
            }
            let sibling = self.model.session(t).offering == offering;
            let domain = self.model.domain(t);
            let live = &self.live[t];

            let affected = |c: &Candidate| c.day == cand.day || (sibling && c.teacher != cand.teacher);
            if !live.iter().any(|&i| affected(&domain[i as usize])) {
                continue;
            }
            let kept: Vec<u32> = live
                .iter()
                .copied()
                .filter(|&i| {
                    let c = &domain[i as usize];
                    !affected(c) || self.evaluator.free_of_clashes(&self.assignment, t, c)
                })
                .collect();
            if kept.len() == live.len() {
                continue;
            }
            let wiped = kept.is_empty();
            trail.push((t, std::mem::replace(&mut self.live[t], kept)));
            if wiped {
                return false;
            }
        }
        true
    }

    fn undo(&mut self, frame: &mut Frame) {
        self.assignment.unbind(self.model, frame.session);
        while let Some((t, previous)) = frame.trail.pop() {
            self.live[t] = previous;
        }
        frame.bound = false;
    }

    fn check_stop(&mut self) -> Option<Stop> {
        if self.signals.is_cancelled() {
            return Some(Stop::Cancelled);
        }
        if self.stats.nodes >= self.max_nodes {
            return Some(Stop::TimedOut);
        }
        self.ticks += 1;
        if self.ticks % CLOCK_INTERVAL == 0 && past(self.deadline) {
            return Some(Stop::TimedOut);
        }
        None
    }
}

impl From<Stop> for FeasibilityOutcome {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::TimedOut => Self::TimedOut,
            Stop::Cancelled => Self::Cancelled,
        }
    }
}
