//! Teacher availability records: blackout windows and preferences.
//!
//! Both are scoped records supplied alongside the entity snapshot. A
//! record with `scope = None` applies to every scope; otherwise it only
//! applies to runs of that scope (e.g. a semester).
//!
//! - [`BlackoutWindow`]: hard. A teacher is never scheduled inside one.
//! - [`Preference`]: soft. Adds `weight` to the objective for every
//!   period a session of that teacher covers inside the slot.

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// Hard unavailability of a teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackoutWindow {
    /// Teacher concerned.
    pub teacher_id: String,
    /// Blocked slot.
    pub slot: TimeSlot,
    /// Scope the record applies to. `None` = all scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
}

impl BlackoutWindow {
    /// Creates an unscoped blackout window.
    pub fn new(teacher_id: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            slot,
            scope: None,
            reason: None,
        }
    }

    /// Restricts the record to a scope.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the record applies to runs of `scope`.
    pub fn applies_to(&self, scope: &str) -> bool {
        self.scope.as_deref().map_or(true, |s| s == scope)
    }
}

/// Soft time preference of a teacher.
///
/// Positive weights attract sessions, negative weights repel them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    /// Teacher concerned.
    pub teacher_id: String,
    /// Slot the preference covers.
    pub slot: TimeSlot,
    /// Weight per covered period.
    pub weight: f64,
    /// Scope the record applies to. `None` = all scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl Preference {
    /// Creates an unscoped preference with an explicit weight.
    pub fn new(teacher_id: impl Into<String>, slot: TimeSlot, weight: f64) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            slot,
            weight,
            scope: None,
        }
    }

    /// A preferred slot (weight made non-negative).
    pub fn preferred(teacher_id: impl Into<String>, slot: TimeSlot, weight: f64) -> Self {
        Self::new(teacher_id, slot, weight.abs())
    }

    /// An avoided slot (weight made non-positive).
    pub fn avoided(teacher_id: impl Into<String>, slot: TimeSlot, weight: f64) -> Self {
        Self::new(teacher_id, slot, -weight.abs())
    }

    /// Restricts the record to a scope.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Whether the record applies to runs of `scope`.
    pub fn applies_to(&self, scope: &str) -> bool {
        self.scope.as_deref().map_or(true, |s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackout_scope() {
        let global = BlackoutWindow::new("T1", TimeSlot::new(0, 0, 2));
        assert!(global.applies_to("2024-fall"));
        assert!(global.applies_to("2025-spring"));

        let fall = BlackoutWindow::new("T1", TimeSlot::new(0, 0, 2))
            .in_scope("2024-fall")
            .with_reason("committee");
        assert!(fall.applies_to("2024-fall"));
        assert!(!fall.applies_to("2025-spring"));
        assert_eq!(fall.reason.as_deref(), Some("committee"));
    }

    #[test]
    fn test_preference_sign() {
        let p = Preference::preferred("T1", TimeSlot::single(0, 0), -3.0);
        assert!((p.weight - 3.0).abs() < 1e-10);

        let a = Preference::avoided("T1", TimeSlot::single(0, 0), 3.0);
        assert!((a.weight + 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_preference_scope() {
        let p = Preference::new("T1", TimeSlot::single(1, 1), 1.0).in_scope("S1");
        assert!(p.applies_to("S1"));
        assert!(!p.applies_to("S2"));
    }
}
