//! Timetabling domain models.
//!
//! Provides the entity records exchanged with the CRUD layer and the
//! frozen timetable handed back. Every record is field-named and
//! serde-serializable.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School |
//! |-------------|-----------|--------|
//! | Offering | Course section | Subject lesson plan |
//! | Cohort | Administrative class | Form / homeroom |
//! | Session | Weekly lecture | Lesson |
//! | Timetable | Semester schedule | Term timetable |

mod availability;
mod calendar;
mod classroom;
mod cohort;
mod course;
mod offering;
mod snapshot;
mod teacher;
mod timetable;

pub use availability::{BlackoutWindow, Preference};
pub use calendar::{
    period_mask, TimeSlot, WeekGrid, WeekPattern, WeekSpan, MAX_DAYS, MAX_PERIODS_PER_DAY,
};
pub use classroom::Classroom;
pub use cohort::Cohort;
pub use course::Course;
pub use offering::Offering;
pub use snapshot::DomainSnapshot;
pub use teacher::Teacher;
pub use timetable::{
    FeasibilityStatus, SessionAssignment, SessionKey, Timetable, Violation, ViolationType,
};
