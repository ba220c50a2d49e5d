//! Teacher model.
//!
//! Teachers deliver offerings. Each teacher carries a set of
//! qualifications (subjects) that decide which unpinned offerings
//! the solver may hand them. Hard unavailability and soft time
//! preferences are separate scoped records, see
//! [`BlackoutWindow`](super::BlackoutWindow) and [`Preference`](super::Preference).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A teacher who can be assigned to offerings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Subjects this teacher is qualified to teach.
    pub qualifications: BTreeSet<String>,
}

impl Teacher {
    /// Creates a new teacher with no qualifications.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            qualifications: BTreeSet::new(),
        }
    }

    /// Sets the teacher name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a qualification.
    pub fn with_qualification(mut self, subject: impl Into<String>) -> Self {
        self.qualifications.insert(subject.into());
        self
    }

    /// Whether this teacher may teach the given subject.
    pub fn is_qualified(&self, subject: &str) -> bool {
        self.qualifications.contains(subject)
    }
}
