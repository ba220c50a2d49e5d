//! Course model.
//!
//! A course defines what is taught and how: its subject (for teacher
//! eligibility), the room features it needs, and its weekly rhythm of
//! `sessions_per_week` sessions of `session_duration` consecutive periods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A course that can be offered to cohorts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Subject a teacher must be qualified in. `None` = only pinned teachers.
    #[serde(default)]
    pub subject: Option<String>,
    /// Feature tags the hosting classroom must offer.
    #[serde(default)]
    pub required_features: BTreeSet<String>,
    /// Sessions per teaching week.
    pub sessions_per_week: u32,
    /// Consecutive periods per session.
    pub session_duration: u8,
}

impl Course {
    /// Creates a course with the given weekly rhythm.
    pub fn new(id: impl Into<String>, sessions_per_week: u32, session_duration: u8) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            subject: None,
            required_features: BTreeSet::new(),
            sessions_per_week,
            session_duration,
        }
    }

    /// Sets the course name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a required classroom feature.
    pub fn with_required_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.insert(feature.into());
        self
    }

    /// Weekly period-load: sessions × duration.
    pub fn weekly_load(&self) -> u32 {
        self.sessions_per_week * self.session_duration as u32
    }
}
