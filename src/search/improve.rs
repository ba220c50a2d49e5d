//! Improvement phase: simulated annealing over feasibility-preserving moves.
//!
//! Moves:
//! - **Relocate**: give one session another candidate with its current
//!   teacher (the offering's teacher is fixed after phase 1).
//! - **Swap**: exchange day, start and classroom between two sessions;
//!   each keeps its own duration and teacher.
//!
//! A move that breaks any hard constraint is never applied. Score
//! deltas come from [`ConstraintEvaluator::contribution`], so a move
//! costs O(1) regardless of instance size.

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{past, RunSignals, SearchStats};
use crate::config::SearchBudget;
use crate::domain::{Assignment, Candidate, DomainModel};
use crate::evaluator::ConstraintEvaluator;

const EPS: f64 = 1e-9;

/// Upper bound on polish sweeps.
const MAX_POLISH_PASSES: u32 = 64;

pub(crate) enum ImproveOutcome {
    Done { assignment: Assignment, score: f64 },
    Cancelled,
}

pub(crate) struct Improver<'a> {
    model: &'a DomainModel,
    evaluator: ConstraintEvaluator<'a>,
    budget: &'a SearchBudget,
    signals: &'a RunSignals,
    deadline: Option<Instant>,
    rng: SmallRng,
    temperature: f64,
    worsening_left: u64,
}

impl<'a> Improver<'a> {
    pub(crate) fn new(
        evaluator: ConstraintEvaluator<'a>,
        budget: &'a SearchBudget,
        seed: u64,
        signals: &'a RunSignals,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            model: evaluator.model(),
            evaluator,
            budget,
            signals,
            deadline,
            rng: SmallRng::seed_from_u64(seed),
            temperature: budget.initial_temperature,
            worsening_left: budget.max_non_improving,
        }
    }

    pub(crate) fn run(
        mut self,
        mut current: Assignment,
        initial_score: f64,
        stats: &mut SearchStats,
    ) -> ImproveOutcome {
        let n = self.model.session_count();
        // Candidates per session restricted to its fixed teacher.
        let moves: Vec<Vec<Candidate>> = (0..n)
            .map(|s| match current.binding(s) {
                Some(bound) => self
                    .model
                    .domain(s)
                    .iter()
                    .copied()
                    .filter(|c| c.teacher == bound.teacher)
                    .collect(),
                None => Vec::new(),
            })
            .collect();

        let mut score = initial_score;
        let mut best = current.clone();
        let mut best_score = score;
        let iterations = self.budget.improvement_iterations;

        if n > 0 {
            for iter in 0..iterations {
                if self.signals.is_cancelled() {
                    return ImproveOutcome::Cancelled;
                }
                if iter % 128 == 0 {
                    if past(self.deadline) {
                        break;
                    }
                    self.signals
                        .report(0.5 + 0.45 * iter as f64 / iterations as f64);
                }
                stats.iterations += 1;

                let delta = if n > 1 && self.rng.random_bool(self.budget.swap_probability) {
                    let a = self.rng.random_range(0..n);
                    let b = self.rng.random_range(0..n);
                    self.try_swap(&mut current, a, b)
                } else {
                    let s = self.rng.random_range(0..n);
                    self.try_relocate(&mut current, s, &moves[s])
                };

                if let Some(delta) = delta {
                    score += delta;
                    if delta >= -EPS {
                        stats.improving_moves += 1;
                    } else {
                        stats.worsening_moves += 1;
                    }
                    if score > best_score + EPS {
                        best_score = score;
                        best = current.clone();
                    }
                }
                self.temperature *= self.budget.cooling_rate;
            }
        }

        if self.budget.polish && !past(self.deadline) {
            match self.polish(&mut best, &moves, stats) {
                Some(gain) => best_score += gain,
                None => return ImproveOutcome::Cancelled,
            }
        }

        // Recompute to shed accumulated floating-point drift.
        let score = self.evaluator.score(&best);
        debug_assert!((score - best_score).abs() < 1e-6 * (1.0 + score.abs()));
        ImproveOutcome::Done {
            assignment: best,
            score,
        }
    }

    fn accept(&mut self, delta: f64) -> bool {
        if delta >= -EPS {
            return true;
        }
        if self.worsening_left == 0 {
            return false;
        }
        let p = (delta / self.temperature).exp();
        if self.rng.random::<f64>() < p {
            self.worsening_left -= 1;
            true
        } else {
            false
        }
    }

    fn try_relocate(&mut self, a: &mut Assignment, s: usize, moves: &[Candidate]) -> Option<f64> {
        if moves.is_empty() {
            return None;
        }
        let target = moves[self.rng.random_range(0..moves.len())];
        let old = a.binding(s)?;
        if target == old {
            return None;
        }

        a.unbind(self.model, s);
        if !self.evaluator.free_of_clashes(a, s, &target) {
            a.bind(self.model, s, old);
            return None;
        }
        let delta = self.evaluator.contribution(a, s, &target) - self.evaluator.contribution(a, s, &old);
        if self.accept(delta) {
            a.bind(self.model, s, target);
            Some(delta)
        } else {
            a.bind(self.model, s, old);
            None
        }
    }

    fn try_swap(&mut self, a: &mut Assignment, s1: usize, s2: usize) -> Option<f64> {
        if s1 == s2 {
            return None;
        }
        let old1 = a.binding(s1)?;
        let old2 = a.binding(s2)?;
        let new1 = Candidate { teacher: old1.teacher, ..old2 };
        let new2 = Candidate { teacher: old2.teacher, ..old1 };
        if new1 == old1 && new2 == old2 {
            return None;
        }

        a.unbind(self.model, s1);
        let removed1 = self.evaluator.contribution(a, s1, &old1);
        a.unbind(self.model, s2);
        let removed2 = self.evaluator.contribution(a, s2, &old2);

        let restore = |a: &mut Assignment, model: &DomainModel| {
            a.bind(model, s2, old2);
            a.bind(model, s1, old1);
        };

        if !self.evaluator.feasible(a, s1, &new1) {
            restore(a, self.model);
            return None;
        }
        let added1 = self.evaluator.contribution(a, s1, &new1);
        a.bind(self.model, s1, new1);
        if !self.evaluator.feasible(a, s2, &new2) {
            a.unbind(self.model, s1);
            restore(a, self.model);
            return None;
        }
        let added2 = self.evaluator.contribution(a, s2, &new2);

        let delta = added1 + added2 - removed1 - removed2;
        if self.accept(delta) {
            a.bind(self.model, s2, new2);
            Some(delta)
        } else {
            a.unbind(self.model, s1);
            restore(a, self.model);
            None
        }
    }

    /// Steepest-ascent relocation sweeps until no session can improve.
    /// Returns the total gain, or `None` if cancelled.
    fn polish(&mut self, a: &mut Assignment, moves: &[Vec<Candidate>], stats: &mut SearchStats) -> Option<f64> {
        let mut gain = 0.0;
        for _ in 0..MAX_POLISH_PASSES {
            stats.polish_passes += 1;
            let mut improved = false;
            for (s, candidates) in moves.iter().enumerate() {
                if self.signals.is_cancelled() {
                    return None;
                }
                if past(self.deadline) {
                    return Some(gain);
                }
                let Some(old) = a.unbind(self.model, s) else {
                    continue;
                };
                let base = self.evaluator.contribution(a, s, &old);
                let mut best = (old, 0.0);
                for c in candidates {
                    if *c == old || !self.evaluator.free_of_clashes(a, s, c) {
                        continue;
                    }
                    let g = self.evaluator.contribution(a, s, c) - base;
                    if g > best.1 + EPS {
                        best = (*c, g);
                    }
                }
                a.bind(self.model, s, best.0);
                if best.0 != old {
                    gain += best.1;
                    stats.improving_moves += 1;
                    improved = true;
                }
            }
            self.signals.report(0.95);
            if !improved {
                break;
            }
        }
        Some(gain)
    }
}
