use proptest::collection::vec;
use proptest::prelude::*;

use u_timetable::models::*;

/// One teacher, one cohort, one plain room; a single offering of
/// `sessions` one-period sessions.
pub fn single_offering(scope: &str, days: u8, periods: u8, sessions: u32) -> DomainSnapshot {
    DomainSnapshot::new(scope)
        .with_grid(WeekGrid::new(days, periods))
        .with_teacher(Teacher::new("T").with_qualification("gen"))
        .with_course(Course::new("C", sessions, 1).with_subject("gen"))
        .with_cohort(Cohort::new("K", 20))
        .with_classroom(Classroom::new("R", 30))
        .with_offering(Offering::new("O", "C", "K", scope))
}

/// A mid-sized instance with shared teachers, lab courses and blackouts.
pub fn department(scope: &str) -> DomainSnapshot {
    let mut snap = DomainSnapshot::new(scope)
        .with_grid(WeekGrid::new(5, 8).with_closed(TimeSlot::new(2, 6, 2)))
        .with_teacher(Teacher::new("T-ALG").with_qualification("math"))
        .with_teacher(Teacher::new("T-CAL").with_qualification("math"))
        .with_teacher(Teacher::new("T-PHY").with_qualification("physics"))
        .with_teacher(Teacher::new("T-CHM").with_qualification("chem").with_qualification("physics"))
        .with_course(Course::new("ALG", 2, 2).with_subject("math"))
        .with_course(Course::new("CAL", 3, 1).with_subject("math"))
        .with_course(Course::new("PHY", 2, 2).with_subject("physics"))
        .with_course(Course::new("CHM-LAB", 1, 3).with_subject("chem").with_required_feature("lab"))
        .with_classroom(Classroom::new("A-101", 40))
        .with_classroom(Classroom::new("A-102", 40).with_unavailable(TimeSlot::new(0, 0, 4)))
        .with_classroom(Classroom::new("B-LAB", 30).with_feature("lab"))
        .with_blackout(BlackoutWindow::new("T-PHY", TimeSlot::new(0, 0, 8)).with_reason("research day"))
        .with_blackout(BlackoutWindow::new("T-ALG", TimeSlot::new(4, 4, 4)))
        .with_preference(Preference::preferred("T-CAL", TimeSlot::new(1, 0, 2), 2.0))
        .with_preference(Preference::avoided("T-CHM", TimeSlot::new(4, 0, 8), 1.0));

    for cohort in ["CS-1", "CS-2", "EE-1"] {
        snap = snap.with_cohort(Cohort::new(cohort, 28));
        for course in ["ALG", "CAL", "PHY", "CHM-LAB"] {
            snap = snap.with_offering(Offering::new(
                format!("{course}/{cohort}"),
                course,
                cohort,
                scope,
            ));
        }
    }
    snap
}

/// Random small instances. Every generated snapshot passes validation;
/// feasibility is left to chance.
pub fn arb_snapshot() -> impl Strategy<Value = DomainSnapshot> {
    (
        1u8..=3,
        2u8..=6,
        1usize..=3,
        1usize..=3,
        1usize..=3,
        vec((0usize..3, 0usize..3, 1u32..=3, 1u8..=2, any::<bool>()), 1..=4),
        vec((0usize..3, 0u8..3, 0u8..6), 0..=3),
        vec((0usize..3, 0u8..3, 0u8..6, -3i32..=5), 0..=3),
    )
        .prop_map(
            |(days, periods, n_teachers, n_cohorts, n_rooms, offerings, blackouts, preferences)| {
                let mut snap = DomainSnapshot::new("prop").with_grid(WeekGrid::new(days, periods));
                for t in 0..n_teachers {
                    snap = snap.with_teacher(Teacher::new(format!("T{t}")).with_qualification("gen"));
                }
                for c in 0..n_cohorts {
                    snap = snap.with_cohort(Cohort::new(format!("K{c}"), 20));
                }
                for r in 0..n_rooms {
                    let room = Classroom::new(format!("R{r}"), 30);
                    snap = snap.with_classroom(if r == 0 { room.with_feature("lab") } else { room });
                }
                for (i, (teacher, cohort, sessions, duration, lab)) in offerings.into_iter().enumerate() {
                    let mut course = Course::new(format!("C{i}"), sessions, duration).with_subject("gen");
                    if lab {
                        course = course.with_required_feature("lab");
                    }
                    let mut offering = Offering::new(
                        format!("O{i}"),
                        format!("C{i}"),
                        format!("K{}", cohort % n_cohorts),
                        "prop",
                    );
                    // teacher index 2 leaves the choice to the search
                    if teacher < 2 {
                        offering = offering.with_teacher(format!("T{}", teacher % n_teachers));
                    }
                    snap = snap.with_course(course).with_offering(offering);
                }
                for (t, d, p) in blackouts {
                    snap = snap.with_blackout(BlackoutWindow::new(
                        format!("T{}", t % n_teachers),
                        TimeSlot::single(d % days, p % periods),
                    ));
                }
                for (t, d, p, w) in preferences {
                    snap = snap.with_preference(Preference::new(
                        format!("T{}", t % n_teachers),
                        TimeSlot::single(d % days, p % periods),
                        w as f64,
                    ));
                }
                snap
            },
        )
}
