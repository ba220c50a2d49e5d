use proptest::prelude::*;

use u_timetable::config::EngineConfig;
use u_timetable::domain::{Candidate, DomainModel};
use u_timetable::evaluator::{audit, ConstraintEvaluator};
use u_timetable::models::Timetable;
use u_timetable::search::{RunSignals, SearchEngine, SearchOutcome};
use u_timetable::validation::validate_snapshot;

use crate::strategy::arb_snapshot;

fn quick_config(seed: u64) -> EngineConfig {
    EngineConfig::default()
        .with_max_nodes(20_000)
        .with_improvement_iterations(300)
        .with_seed(seed)
}

proptest! {
    /// Generated instances are well-formed.
    #[test]
    fn test_generated_snapshots_validate(snap in arb_snapshot()) {
        prop_assert!(validate_snapshot(&snap).is_ok());
    }

    /// Any timetable the search returns satisfies every hard constraint,
    /// binds every session, and reports its true score.
    #[test]
    fn test_solutions_satisfy_hard_constraints(snap in arb_snapshot(), seed in 0u64..1000) {
        let model = DomainModel::build(&snap).unwrap();
        let config = quick_config(seed);
        let signals = RunSignals::new();
        if let SearchOutcome::Solved(result) = SearchEngine::new(&model, &config).run(&signals) {
            let tt = Timetable::new(model.scope(), model.materialize(&result.assignment), result.score);
            let violations = audit(&model, &tt);
            prop_assert!(violations.is_empty(), "violations: {:?}", violations);
            prop_assert_eq!(tt.session_count(), model.session_count());

            let eval = ConstraintEvaluator::new(&model, &config.weights);
            prop_assert!((eval.score(&result.assignment) - result.score).abs() < 1e-6);
            prop_assert!(result.score >= result.initial_score - 1e-9);
        }
    }

    /// Same snapshot and seed give the same outcome.
    #[test]
    fn test_search_is_deterministic(snap in arb_snapshot(), seed in 0u64..1000) {
        let model = DomainModel::build(&snap).unwrap();
        let config = quick_config(seed);
        let a = SearchEngine::new(&model, &config).run(&RunSignals::new());
        let b = SearchEngine::new(&model, &config).run(&RunSignals::new());
        match (a, b) {
            (SearchOutcome::Solved(a), SearchOutcome::Solved(b)) => {
                prop_assert_eq!(a.assignment, b.assignment);
                prop_assert_eq!(a.score, b.score);
            }
            (SearchOutcome::Infeasible(a), SearchOutcome::Infeasible(b))
            | (SearchOutcome::TimedOut(a), SearchOutcome::TimedOut(b)) => {
                prop_assert_eq!(a.nodes, b.nodes);
            }
            (a, b) => prop_assert!(false, "outcomes differ: {:?} vs {:?}", a, b),
        }
    }

    /// Static domains hold exactly the statically feasible candidates, in
    /// (day, start, room, teacher) order.
    #[test]
    fn test_domains_are_exact(snap in arb_snapshot()) {
        let model = DomainModel::build(&snap).unwrap();
        let config = EngineConfig::default();
        let eval = ConstraintEvaluator::new(&model, &config.weights);
        for s in 0..model.session_count() {
            let domain = model.domain(s);
            prop_assert!(domain.iter().all(|c| eval.statically_feasible(s, c)));
            for w in domain.windows(2) {
                prop_assert!(
                    (w[0].day, w[0].start, w[0].room, w[0].teacher)
                        < (w[1].day, w[1].start, w[1].room, w[1].teacher)
                );
            }
            let grid = model.grid();
            for day in 0..grid.days {
                for start in 0..grid.periods_per_day {
                    for room in 0..model.classrooms().len() {
                        for teacher in 0..model.teachers().len() {
                            let c = Candidate::new(day, start, room, teacher);
                            if eval.statically_feasible(s, &c) {
                                prop_assert!(domain.contains(&c));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Observed progress is monotonic whatever order values are reported in.
    #[test]
    fn test_progress_monotonic(reports in proptest::collection::vec(0.0f64..=1.0, 0..50)) {
        let signals = RunSignals::new();
        let mut last = signals.progress();
        for r in reports {
            signals.report(r);
            let now = signals.progress();
            prop_assert!(now >= last);
            last = now;
        }
    }
}
