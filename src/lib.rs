//! Course timetabling engine.
//!
//! Places every weekly session of every course offering into a week grid,
//! classroom and teacher so that no hard constraint is broken, then
//! improves the result against teacher preferences and session spread.
//! Generation runs in the background per scheduling scope; published
//! timetables are served from an in-memory index.
//!
//! # Modules
//!
//! - **`models`**: Entity records: `Teacher`, `Course`, `Cohort`,
//!   `Classroom`, `Offering`, `WeekGrid`, `Timetable`, `DomainSnapshot`
//! - **`validation`**: Input integrity checks (duplicate IDs, references, grid bounds)
//! - **`domain`**: Compiled model (bitmask calendars, candidate domains) and `Assignment`
//! - **`evaluator`**: Hard-constraint checks, objective, independent audit
//! - **`search`**: Backtracking with forward checking, then simulated annealing
//! - **`session`**: Run lifecycle, cancellation, one active run per scope
//! - **`index`**: Published timetables and teacher / cohort / classroom / week views
//! - **`kpi`**: Timetable quality metrics
//! - **`api`**: Typed request and response records
//!
//! # Example
//!
//! ```
//! use u_timetable::models::*;
//! use u_timetable::session::GenerationManager;
//!
//! let snapshot = DomainSnapshot::new("2025-fall")
//!     .with_grid(WeekGrid::new(5, 8))
//!     .with_teacher(Teacher::new("T1").with_qualification("math"))
//!     .with_course(Course::new("MATH101", 2, 2).with_subject("math"))
//!     .with_cohort(Cohort::new("CS-1", 40))
//!     .with_classroom(Classroom::new("A-101", 60))
//!     .with_offering(Offering::new("O1", "MATH101", "CS-1", "2025-fall"));
//!
//! let manager = GenerationManager::default();
//! let timetable = manager.generate(&snapshot).unwrap();
//! assert_eq!(timetable.session_count(), 2);
//! assert!(timetable.is_feasible());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Lewis (2008), "A survey of metaheuristic-based techniques for University Timetabling problems"

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod kpi;
pub mod models;
pub mod search;
pub mod session;
pub mod validation;

pub use error::{Result, TimetableError};
