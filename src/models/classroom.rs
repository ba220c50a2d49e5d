//! Classroom model.
//!
//! Classrooms host sessions. A classroom fits an offering iff its
//! capacity covers the cohort size and its feature tags include every
//! feature the course requires.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::TimeSlot;

/// A room that sessions can be placed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    /// Unique classroom identifier. Candidate order follows this ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Building the room belongs to.
    #[serde(default)]
    pub building: Option<String>,
    /// Seats available. Negative values are rejected by validation.
    pub capacity: i32,
    /// Feature tags (e.g. "lab", "projector").
    pub features: BTreeSet<String>,
    /// Whether the room may be used at all.
    #[serde(default = "default_available")]
    pub available: bool,
    /// Slots in which the room is not bookable.
    #[serde(default)]
    pub unavailable: Vec<TimeSlot>,
}

fn default_available() -> bool {
    true
}

impl Classroom {
    /// Creates an available classroom.
    pub fn new(id: impl Into<String>, capacity: i32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            building: None,
            capacity,
            features: BTreeSet::new(),
            available: true,
            unavailable: Vec::new(),
        }
    }

    /// Sets the classroom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the building.
    pub fn with_building(mut self, building: impl Into<String>) -> Self {
        self.building = Some(building.into());
        self
    }

    /// Adds a feature tag.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    /// Marks a slot as not bookable.
    pub fn with_unavailable(mut self, slot: TimeSlot) -> Self {
        self.unavailable.push(slot);
        self
    }

    /// Removes the room from consideration.
    pub fn disabled(mut self) -> Self {
        self.available = false;
        self
    }

    /// Whether the room offers every required feature.
    pub fn has_features(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.features)
    }

    /// Whether the room can host a cohort of `size` students needing `required` features.
    pub fn fits(&self, size: i32, required: &BTreeSet<String>) -> bool {
        self.available && self.capacity >= size && self.has_features(required)
    }
}
