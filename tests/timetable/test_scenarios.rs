use u_timetable::config::EngineConfig;
use u_timetable::domain::DomainModel;
use u_timetable::evaluator::audit;
use u_timetable::models::*;
use u_timetable::session::GenerationManager;
use u_timetable::TimetableError;

use crate::strategy::{department, single_offering};

#[test]
fn test_spread_penalty_separates_sessions() {
    // Two sessions fit on day 0 alone, but a same-day pair costs 10.
    let snap = single_offering("a", 2, 4, 2);
    let manager = GenerationManager::default();
    let tt = manager.generate(&snap).unwrap();

    assert_eq!(tt.session_count(), 2);
    let days: Vec<u8> = tt.assignments.iter().map(|a| a.slot.day).collect();
    assert_ne!(days[0], days[1]);
    assert!(tt.score.abs() < 1e-9);
}

#[test]
fn test_blackout_on_only_slot_is_infeasible() {
    let snap = single_offering("b", 1, 1, 1)
        .with_blackout(BlackoutWindow::new("T", TimeSlot::single(0, 0)));
    let manager = GenerationManager::default();
    match manager.generate(&snap) {
        Err(TimetableError::Infeasible { scope }) => assert_eq!(scope, "b"),
        other => panic!("expected Infeasible, got {other:?}"),
    }
    assert!(manager.index().current("b").is_none());
}

/// Two lab sessions, one shared teacher, and a lab that is only open in
/// period 0 of a one-day, two-period week.
fn lab_contention(second_needs_lab: bool) -> DomainSnapshot {
    let mut second = Course::new("C2", 1, 1).with_subject("sci");
    if second_needs_lab {
        second = second.with_required_feature("lab");
    }
    DomainSnapshot::new("c")
        .with_grid(WeekGrid::new(1, 2))
        .with_teacher(Teacher::new("T").with_qualification("sci"))
        .with_course(Course::new("C1", 1, 1).with_subject("sci").with_required_feature("lab"))
        .with_course(second)
        .with_cohort(Cohort::new("K1", 20))
        .with_cohort(Cohort::new("K2", 20))
        .with_classroom(
            Classroom::new("LAB", 30)
                .with_feature("lab")
                .with_unavailable(TimeSlot::single(0, 1)),
        )
        .with_classroom(Classroom::new("ROOM", 30))
        .with_offering(Offering::new("O1", "C1", "K1", "c"))
        .with_offering(Offering::new("O2", "C2", "K2", "c"))
}

#[test]
fn test_lab_contention() {
    let manager = GenerationManager::default();
    assert!(matches!(
        manager.generate(&lab_contention(true)),
        Err(TimetableError::Infeasible { .. })
    ));

    let tt = manager.generate(&lab_contention(false)).unwrap();
    let o1 = tt.assignment_for_session(&SessionKey::new("O1", 0)).unwrap();
    let o2 = tt.assignment_for_session(&SessionKey::new("O2", 0)).unwrap();
    assert_eq!((o1.classroom_id.as_str(), o1.slot.start), ("LAB", 0));
    assert_eq!((o2.classroom_id.as_str(), o2.slot.start), ("ROOM", 1));
}

#[test]
fn test_preference_pulls_session_and_raises_score() {
    let base = DomainSnapshot::new("d")
        .with_grid(WeekGrid::new(3, 4))
        .with_teacher(Teacher::new("T1").with_qualification("art"))
        .with_teacher(Teacher::new("T2").with_qualification("music"))
        .with_course(Course::new("ART", 1, 1).with_subject("art"))
        .with_course(Course::new("MUS", 2, 2).with_subject("music"))
        .with_cohort(Cohort::new("K1", 20))
        .with_cohort(Cohort::new("K2", 20))
        .with_classroom(Classroom::new("R1", 30))
        .with_classroom(Classroom::new("R2", 30))
        .with_offering(Offering::new("O-ART", "ART", "K1", "d"))
        .with_offering(Offering::new("O-MUS", "MUS", "K2", "d"));

    let before = GenerationManager::default().generate(&base).unwrap();
    let preferred = base.with_preference(Preference::preferred("T1", TimeSlot::single(1, 1), 100.0));
    let after = GenerationManager::default().generate(&preferred).unwrap();

    assert!(after.score >= before.score);
    assert!(after.score >= 100.0 - 1e-9);
    let art = after.assignment_for_session(&SessionKey::new("O-ART", 0)).unwrap();
    assert_eq!(art.slot, TimeSlot::single(1, 1));
}

#[test]
fn test_department_timetable_is_valid() {
    let snap = department("dept");
    let manager = GenerationManager::default();
    let tt = manager.generate(&snap).unwrap();
    let model = DomainModel::build(&snap).unwrap();

    assert_eq!(tt.session_count(), model.session_count());
    assert!(audit(&model, &tt).is_empty());

    // Every lab session sits in the lab with the only chemistry teacher.
    for a in tt.assignments.iter().filter(|a| a.course_id == "CHM-LAB") {
        assert_eq!(a.classroom_id, "B-LAB");
        assert_eq!(a.teacher_id, "T-CHM");
    }
    // Research day and room closures hold.
    assert!(tt
        .assignments_for_teacher("T-PHY")
        .iter()
        .all(|a| a.slot.day != 0));
    assert!(tt
        .assignments_for_classroom("A-102")
        .iter()
        .all(|a| !a.slot.overlaps(&TimeSlot::new(0, 0, 4))));
    assert!(tt.assignments.iter().all(|a| !a.slot.overlaps(&TimeSlot::new(2, 6, 2))));
}

#[test]
fn test_same_seed_same_timetable() {
    let snap = department("seeded");
    let config = EngineConfig::default().with_seed(2024);
    let first = GenerationManager::new(config.clone()).generate(&snap).unwrap();
    let second = GenerationManager::new(config).generate(&snap).unwrap();
    assert_eq!(first.assignments, second.assignments);
    assert!((first.score - second.score).abs() < 1e-12);
}

#[test]
fn test_offerings_of_other_scopes_ignored() {
    let snap = single_offering("fall", 2, 4, 1)
        .with_course(Course::new("X", 3, 1).with_subject("gen"))
        .with_offering(Offering::new("O-SPRING", "X", "K", "spring"));
    let tt = GenerationManager::default().generate(&snap).unwrap();
    assert_eq!(tt.session_count(), 1);
    assert!(tt.assignments.iter().all(|a| a.session.offering_id == "O"));
}
