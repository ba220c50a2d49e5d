//! Cohort (class) model.
//!
//! A cohort is a fixed group of students taking offerings together.
//! Its existing weekly commitments are expressed as busy slots; the
//! complement is the cohort's free-time mask.

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A class of students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    /// Unique cohort identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Number of students. Negative values are rejected by validation.
    pub size: i32,
    /// Slots already committed elsewhere.
    #[serde(default)]
    pub busy: Vec<TimeSlot>,
}

impl Cohort {
    /// Creates a cohort with no prior commitments.
    pub fn new(id: impl Into<String>, size: i32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            size,
            busy: Vec::new(),
        }
    }

    /// Sets the cohort name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a busy slot.
    pub fn with_busy(mut self, slot: TimeSlot) -> Self {
        self.busy.push(slot);
        self
    }

    /// Whether the cohort is free for the whole slot.
    pub fn is_free(&self, slot: &TimeSlot) -> bool {
        !self.busy.iter().any(|b| b.overlaps(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_free_time() {
        let c = Cohort::new("CS-1", 32)
            .with_name("Computer Science Y1")
            .with_busy(TimeSlot::new(0, 0, 4));

        assert_eq!(c.size, 32);
        assert!(!c.is_free(&TimeSlot::new(0, 3, 2)));
        assert!(c.is_free(&TimeSlot::new(0, 4, 2)));
        assert!(c.is_free(&TimeSlot::new(1, 0, 2)));
    }
}
