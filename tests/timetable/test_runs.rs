use std::sync::Arc;
use std::thread;

use u_timetable::api::{GenerateRequest, TimetableQuery, TimetableService};
use u_timetable::config::EngineConfig;
use u_timetable::index::WeekQuery;
use u_timetable::session::{GenerationManager, RunState};
use u_timetable::TimetableError;

use crate::strategy::{department, single_offering};

fn unbounded() -> EngineConfig {
    EngineConfig::default()
        .with_max_nodes(u64::MAX)
        .with_time_limit(None)
}

#[test]
fn test_cancel_leaves_published_timetable_untouched() {
    let manager = GenerationManager::new(unbounded());

    // 11 sessions on 11 cells: feasible, published as version 1.
    let published = manager.generate(&single_offering("hard", 1, 11, 11)).unwrap();
    assert_eq!(published.version, 1);

    // 12 sessions on 11 cells: search runs until cancelled.
    let run_id = manager.start(&single_offering("hard", 1, 11, 12)).unwrap();
    let progress = manager.cancel(run_id).unwrap();
    assert_eq!(progress.state, RunState::Cancelled);
    assert_eq!(manager.wait(run_id).unwrap(), RunState::Cancelled);

    let current = manager.index().current("hard").unwrap();
    assert!(Arc::ptr_eq(&current, &published));
    assert_eq!(manager.index().version("hard"), 1);
}

#[test]
fn test_progress_never_decreases() {
    let manager = GenerationManager::default();
    let run_id = manager.start(&department("progress")).unwrap();

    let mut last = 0.0;
    loop {
        let progress = manager.progress(run_id).unwrap();
        assert!(progress.fraction >= last);
        assert!((0.0..=1.0).contains(&progress.fraction));
        last = progress.fraction;
        if progress.state.is_terminal() {
            break;
        }
        thread::yield_now();
    }
    assert!(matches!(manager.wait(run_id).unwrap(), RunState::Succeeded { .. }));
    assert!((manager.progress(run_id).unwrap().fraction - 1.0).abs() < 1e-9);
}

#[test]
fn test_scopes_run_independently() {
    let manager = Arc::new(GenerationManager::default());
    let handles: Vec<_> = ["s1", "s2", "s3"]
        .into_iter()
        .map(|scope| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.generate(&single_offering(scope, 3, 4, 3)))
        })
        .collect();
    for h in handles {
        let tt = h.join().unwrap().unwrap();
        assert_eq!(tt.version, 1);
    }
    for scope in ["s1", "s2", "s3"] {
        assert_eq!(manager.index().version(scope), 1);
    }
}

#[test]
fn test_second_start_for_scope_conflicts() {
    let manager = GenerationManager::new(unbounded());
    let first = manager.start(&single_offering("busy", 1, 11, 12)).unwrap();
    let err = manager.start(&single_offering("busy", 1, 11, 12)).unwrap_err();
    assert!(matches!(err, TimetableError::ConcurrentRunConflict { active, .. } if active == first));

    // Other scopes are unaffected.
    let other = manager.generate(&single_offering("free", 2, 2, 2)).unwrap();
    assert_eq!(other.session_count(), 2);

    manager.cancel(first).unwrap();
    manager.wait(first).unwrap();
    assert!(manager.active_run("busy").is_none());
}

#[test]
fn test_regeneration_bumps_version() {
    let service = TimetableService::default();
    let snap = department("regen");
    for expected in 1..=2u64 {
        let accepted = service.start_generation(&GenerateRequest::new(snap.clone())).unwrap();
        let state = service.manager().wait(accepted.run_id).unwrap();
        assert_eq!(
            state.label(),
            "succeeded",
            "run {expected} ended as {state:?}"
        );
        let week = service.query(&TimetableQuery::Week {
            scope: "regen".into(),
            filter: WeekQuery::new(),
        });
        assert_eq!(week.version, Some(expected));
        assert!(!week.stale);
    }
}

#[test]
fn test_budget_exhaustion_reports_timed_out() {
    let manager = GenerationManager::new(EngineConfig::default().with_max_nodes(100));
    let run_id = manager.start(&single_offering("tight", 1, 11, 12)).unwrap();
    assert_eq!(manager.wait(run_id).unwrap(), RunState::TimedOut);
    let progress = manager.progress(run_id).unwrap();
    assert_eq!(progress.stats.unwrap().nodes, 100);
    assert!(progress.kpi.is_none());
    assert!(manager.index().current("tight").is_none());
}
