//! Weekly grid and time slot models.
//!
//! A teaching week is a grid of `days × periods_per_day` cells. Sessions
//! occupy a contiguous run of periods on a single day.
//!
//! # Time Model
//! Days and periods are 0-based indices into the grid. A [`TimeSlot`]
//! covers the half-open period range `[start, start + len)` on one day.
//!
//! # Bitmasks
//! Periods of a day map to bits of a `u64` (bit `p` = period `p`), so a
//! grid holds at most 64 periods per day. Overlap tests reduce to a
//! single `&`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of periods per day representable by a day mask.
pub const MAX_PERIODS_PER_DAY: u8 = 64;

/// Maximum number of teaching days per week.
pub const MAX_DAYS: u8 = 7;

/// A contiguous run of periods `[start, start + len)` on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Day index (0-based).
    pub day: u8,
    /// First period (0-based, inclusive).
    pub start: u8,
    /// Number of periods covered.
    pub len: u8,
}

impl TimeSlot {
    /// Creates a new time slot.
    pub fn new(day: u8, start: u8, len: u8) -> Self {
        Self { day, start, len }
    }

    /// Creates a single-period slot.
    pub fn single(day: u8, period: u8) -> Self {
        Self::new(day, period, 1)
    }

    /// One past the last covered period.
    #[inline]
    pub fn end(&self) -> u16 {
        self.start as u16 + self.len as u16
    }

    /// Whether the slot covers a given period of its day.
    #[inline]
    pub fn contains(&self, day: u8, period: u8) -> bool {
        self.day == day && period >= self.start && (period as u16) < self.end()
    }

    /// Whether two slots share at least one (day, period) cell.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day
            && (self.start as u16) < other.end()
            && (other.start as u16) < self.end()
    }

    /// Bitmask of the covered periods within the slot's day.
    #[inline]
    pub fn mask(&self) -> u64 {
        period_mask(self.start, self.len)
    }

    /// Covered periods in ascending order.
    pub fn periods(&self) -> impl Iterator<Item = u8> {
        let start = self.start;
        let end = self.end().min(MAX_PERIODS_PER_DAY as u16) as u8;
        start..end
    }
}

/// Bitmask with `len` bits set starting at bit `start`.
///
/// Bits past period 63 are dropped.
#[inline]
pub fn period_mask(start: u8, len: u8) -> u64 {
    if len == 0 || start >= MAX_PERIODS_PER_DAY {
        return 0;
    }
    let run = if len >= MAX_PERIODS_PER_DAY {
        u64::MAX
    } else {
        (1u64 << len) - 1
    };
    run << start
}

/// Which teaching weeks of the term an offering runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekPattern {
    /// Every week of the span.
    #[default]
    Every,
    /// Odd-numbered weeks only.
    Odd,
    /// Even-numbered weeks only.
    Even,
}

/// Inclusive range of teaching weeks with a recurrence pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSpan {
    /// First teaching week (1-based, inclusive).
    pub start_week: u16,
    /// Last teaching week (inclusive).
    pub end_week: u16,
    /// Recurrence within the span.
    pub pattern: WeekPattern,
}

impl Default for WeekSpan {
    fn default() -> Self {
        Self {
            start_week: 1,
            end_week: 16,
            pattern: WeekPattern::Every,
        }
    }
}

impl WeekSpan {
    /// Creates a span running every week in `[start_week, end_week]`.
    pub fn new(start_week: u16, end_week: u16) -> Self {
        Self {
            start_week,
            end_week,
            pattern: WeekPattern::Every,
        }
    }

    /// Sets the recurrence pattern.
    pub fn with_pattern(mut self, pattern: WeekPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Whether the offering meets in the given week.
    pub fn includes(&self, week: u16) -> bool {
        if week < self.start_week || week > self.end_week {
            return false;
        }
        match self.pattern {
            WeekPattern::Every => true,
            WeekPattern::Odd => week % 2 == 1,
            WeekPattern::Even => week % 2 == 0,
        }
    }
}

/// The teaching week grid shared by every entity of a scope.
///
/// # Precedence
/// A session may start at period `p` for duration `d` iff:
/// - `p + d <= periods_per_day`, AND
/// - `p` is listed in `block_starts[d]` when that entry exists, AND
/// - no `closed` slot overlaps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekGrid {
    /// Teaching days per week.
    pub days: u8,
    /// Periods per day.
    pub periods_per_day: u8,
    /// Allowed start periods, keyed by session duration.
    /// Durations without an entry may start at any period that fits.
    #[serde(default)]
    pub block_starts: BTreeMap<u8, Vec<u8>>,
    /// Institution-wide closed slots.
    #[serde(default)]
    pub closed: Vec<TimeSlot>,
}

impl Default for WeekGrid {
    fn default() -> Self {
        Self::new(5, 13)
    }
}

impl WeekGrid {
    /// Creates an open grid.
    pub fn new(days: u8, periods_per_day: u8) -> Self {
        Self {
            days,
            periods_per_day,
            block_starts: BTreeMap::new(),
            closed: Vec::new(),
        }
    }

    /// Restricts the start periods for sessions of `duration` periods.
    pub fn with_block_starts(mut self, duration: u8, starts: Vec<u8>) -> Self {
        self.block_starts.insert(duration, starts);
        self
    }

    /// Closes a slot for all teaching.
    pub fn with_closed(mut self, slot: TimeSlot) -> Self {
        self.closed.push(slot);
        self
    }

    /// Total number of (day, period) cells.
    pub fn cell_count(&self) -> usize {
        self.days as usize * self.periods_per_day as usize
    }

    /// Whether a slot lies fully inside the grid.
    pub fn contains(&self, slot: &TimeSlot) -> bool {
        slot.len > 0 && slot.day < self.days && slot.end() <= self.periods_per_day as u16
    }

    /// Start periods allowed for a session of `duration` periods, ascending.
    pub fn allowed_starts(&self, duration: u8) -> Vec<u8> {
        if duration == 0 || duration > self.periods_per_day {
            return Vec::new();
        }
        let last = self.periods_per_day - duration;
        match self.block_starts.get(&duration) {
            Some(starts) => {
                let mut starts: Vec<u8> = starts.iter().copied().filter(|&s| s <= last).collect();
                starts.sort_unstable();
                starts.dedup();
                starts
            }
            None => (0..=last).collect(),
        }
    }

    /// Bitmask of closed periods on a day.
    pub fn closed_mask(&self, day: u8) -> u64 {
        self.closed
            .iter()
            .filter(|s| s.day == day)
            .fold(0, |acc, s| acc | s.mask())
    }
}
