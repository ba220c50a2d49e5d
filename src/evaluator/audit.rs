//! Independent audit of a materialized timetable.
//!
//! Re-checks every hard constraint from the string-keyed bindings, not
//! from the search's bitmasks, so a defect in incremental bookkeeping
//! cannot publish a broken timetable.

use std::collections::{BTreeMap, HashSet};

use crate::domain::DomainModel;
use crate::models::{SessionAssignment, Timetable, Violation, ViolationType};

/// Lists every hard-constraint violation of `timetable` against `model`.
///
/// An empty result means the timetable is complete and valid.
pub fn audit(model: &DomainModel, timetable: &Timetable) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();
    let mut offering_teachers: BTreeMap<&str, &str> = BTreeMap::new();

    for a in &timetable.assignments {
        let Some(s) = model.find_session(&a.session) else {
            violations.push(Violation::new(
                ViolationType::UnknownSession,
                a.session.to_string(),
                format!("Session {} is not part of scope '{}'", a.session, model.scope()),
            ));
            continue;
        };
        if !seen.insert(s) {
            violations.push(Violation::new(
                ViolationType::UnknownSession,
                a.session.to_string(),
                format!("Session {} is bound more than once", a.session),
            ));
            continue;
        }
        check_binding(model, s, a, &mut violations);

        match offering_teachers.get(a.session.offering_id.as_str()) {
            Some(&teacher) if teacher != a.teacher_id => violations.push(Violation::new(
                ViolationType::TeacherMismatch,
                a.session.offering_id.clone(),
                format!(
                    "Offering '{}' is taught by both '{}' and '{}'",
                    a.session.offering_id, teacher, a.teacher_id
                ),
            )),
            Some(_) => {}
            None => {
                offering_teachers.insert(&a.session.offering_id, &a.teacher_id);
            }
        }
    }

    for (s, spec) in model.sessions().iter().enumerate() {
        if !seen.contains(&s) {
            violations.push(Violation::new(
                ViolationType::Unassigned,
                spec.key.to_string(),
                format!("Session {} has no binding", spec.key),
            ));
        }
    }

    let list = &timetable.assignments;
    for (i, a) in list.iter().enumerate() {
        for b in &list[i + 1..] {
            if !a.slot.overlaps(&b.slot) {
                continue;
            }
            let pair = format!("{} / {}", a.session, b.session);
            if a.teacher_id == b.teacher_id {
                violations.push(Violation::new(
                    ViolationType::TeacherClash,
                    a.teacher_id.clone(),
                    format!("Teacher '{}' double-booked: {pair}", a.teacher_id),
                ));
            }
            if a.classroom_id == b.classroom_id {
                violations.push(Violation::new(
                    ViolationType::ClassroomClash,
                    a.classroom_id.clone(),
                    format!("Classroom '{}' double-booked: {pair}", a.classroom_id),
                ));
            }
            if a.cohort_id == b.cohort_id {
                violations.push(Violation::new(
                    ViolationType::CohortClash,
                    a.cohort_id.clone(),
                    format!("Cohort '{}' double-booked: {pair}", a.cohort_id),
                ));
            }
        }
    }

    violations
}

/// Runs [`audit`] and records its findings on the timetable, which is
/// then feasible only if nothing was found.
pub fn audited(model: &DomainModel, timetable: Timetable) -> Timetable {
    let violations = audit(model, &timetable);
    timetable.with_violations(violations)
}

fn check_binding(model: &DomainModel, s: usize, a: &SessionAssignment, out: &mut Vec<Violation>) {
    let spec = model.session(s);
    let o = spec.offering;
    let offering = model.offering(o);
    let id = a.session.to_string();
    let slot = a.slot;

    if slot.len != spec.duration
        || !model.grid().contains(&slot)
        || !model.start_allowed(spec.duration, slot.start)
    {
        out.push(Violation::new(
            ViolationType::OutsideGrid,
            id,
            format!("Session {} at {:?} does not fit the week grid", a.session, slot),
        ));
        return;
    }

    let mask = slot.mask();
    if model.grid_closed_mask(slot.day) & mask != 0 {
        out.push(Violation::new(
            ViolationType::Unavailable,
            id.clone(),
            format!("Session {} falls in a closed period", a.session),
        ));
    }
    if !model.cohort(offering.cohort).is_free(&slot) {
        out.push(Violation::new(
            ViolationType::Unavailable,
            id.clone(),
            format!("Cohort '{}' has a prior commitment at {:?}", a.cohort_id, slot),
        ));
    }

    match model.find_teacher(&a.teacher_id) {
        None => out.push(Violation::new(
            ViolationType::TeacherMismatch,
            id.clone(),
            format!("Unknown teacher '{}'", a.teacher_id),
        )),
        Some(t) => {
            if !model.teacher_eligible(o, t) {
                out.push(Violation::new(
                    ViolationType::TeacherMismatch,
                    id.clone(),
                    format!("Teacher '{}' may not teach offering '{}'", a.teacher_id, offering.id),
                ));
            }
            if model.teacher_blackout_mask(t, slot.day) & mask != 0 {
                out.push(Violation::new(
                    ViolationType::Blackout,
                    a.teacher_id.clone(),
                    format!("Teacher '{}' is blacked out at {:?}", a.teacher_id, slot),
                ));
            }
        }
    }

    let Some(r) = model.find_classroom(&a.classroom_id) else {
        out.push(Violation::new(
            ViolationType::Unavailable,
            id,
            format!("Unknown classroom '{}'", a.classroom_id),
        ));
        return;
    };
    let room = model.classroom(r);
    let size = model.cohort(offering.cohort).size;
    if !room.available || model.room_closed_mask(r, slot.day) & mask != 0 {
        out.push(Violation::new(
            ViolationType::Unavailable,
            room.id.clone(),
            format!("Classroom '{}' is unavailable at {:?}", room.id, slot),
        ));
    }
    if room.capacity < size {
        out.push(Violation::new(
            ViolationType::CapacityExceeded,
            room.id.clone(),
            format!(
                "Classroom '{}' seats {} but cohort '{}' has {}",
                room.id, room.capacity, a.cohort_id, size
            ),
        ));
    }
    if !room.has_features(&model.course(offering.course).required_features) {
        out.push(Violation::new(
            ViolationType::MissingFeature,
            room.id.clone(),
            format!("Classroom '{}' lacks features required by '{}'", room.id, a.course_id),
        ));
    }
}
