//! Timetable quality metrics (KPIs).
//!
//! Computes reporting indicators from a published timetable and the
//! model it was generated from.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage | Bound sessions / required sessions |
//! | Period load | Σ weekly load (sessions × duration) of the scope's courses |
//! | Preference total | Σ raw preference weight over covered periods |
//! | Same-day pairs | Σ_offerings Σ_days C(n_od, 2) |
//! | Avg seat fill | Mean cohort size / classroom capacity |
//! | Avg room utilization | Mean booked periods / open grid periods |
//! | Teacher load | Periods taught per teacher |
//!
//! # Reference
//! McCollum et al. (2010), "Setting the Research Agenda in Automated
//! Timetabling: The Second International Timetabling Competition"

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::DomainModel;
use crate::models::Timetable;

/// Timetable performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableKpi {
    /// Sessions bound.
    pub sessions_bound: usize,
    /// Sessions required by the scope's offerings.
    pub sessions_required: usize,
    /// Teaching periods the scope's offerings need per week.
    pub periods_required: u32,
    /// Teaching periods covered by bindings.
    pub periods_bound: u32,
    /// Fraction of required sessions bound (0.0..1.0).
    pub coverage_rate: f64,
    /// Sum of raw teacher preference weights over covered periods.
    pub preference_total: f64,
    /// Pairs of same-day sessions of one offering.
    pub same_day_pairs: u64,
    /// Mean cohort size over classroom capacity across bindings.
    pub avg_seat_fill: f64,
    /// Mean classroom utilization (0.0..1.0).
    pub avg_room_utilization: f64,
    /// Per-classroom utilization.
    pub utilization_by_classroom: HashMap<String, f64>,
    /// Periods taught per teacher.
    pub teacher_periods: HashMap<String, u32>,
}

impl TimetableKpi {
    /// Computes KPIs for a timetable.
    ///
    /// Bindings referring to entities unknown to `model` are skipped.
    pub fn calculate(timetable: &Timetable, model: &DomainModel) -> Self {
        let sessions_required = model.session_count();
        let sessions_bound = timetable.session_count();
        let periods_required = model
            .offerings()
            .iter()
            .map(|o| model.course(o.course).weekly_load())
            .sum();
        let mut periods_bound = 0u32;

        let mut preference_total = 0.0;
        let mut seat_fill_sum = 0.0;
        let mut seat_fill_count = 0usize;
        let mut teacher_periods: HashMap<String, u32> = HashMap::new();
        let mut per_offering_day: BTreeMap<(&str, u8), u64> = BTreeMap::new();

        for a in &timetable.assignments {
            periods_bound += a.slot.len as u32;
            *teacher_periods.entry(a.teacher_id.clone()).or_insert(0) += a.slot.len as u32;
            *per_offering_day
                .entry((a.session.offering_id.as_str(), a.slot.day))
                .or_insert(0) += 1;

            if let Some(t) = model.find_teacher(&a.teacher_id) {
                preference_total += model.preference_over(t, &a.slot);
            }
            let room = model.find_classroom(&a.classroom_id).map(|r| model.classroom(r));
            let cohort = model.find_cohort(&a.cohort_id).map(|c| model.cohort(c));
            if let (Some(room), Some(cohort)) = (room, cohort) {
                if room.capacity > 0 {
                    seat_fill_sum += cohort.size as f64 / room.capacity as f64;
                    seat_fill_count += 1;
                }
            }
        }

        let same_day_pairs = per_offering_day
            .values()
            .map(|&n| n * n.saturating_sub(1) / 2)
            .sum();

        let grid = model.grid();
        let open_periods: u32 = (0..grid.days)
            .map(|d| grid.periods_per_day as u32 - model.grid_closed_mask(d).count_ones().min(grid.periods_per_day as u32))
            .sum();
        let loads = timetable.classroom_loads();
        let utilization_by_classroom: HashMap<String, f64> = model
            .classrooms()
            .iter()
            .filter(|r| r.available)
            .map(|r| {
                let load = loads.get(&r.id).copied().unwrap_or(0);
                let util = if open_periods == 0 {
                    0.0
                } else {
                    load as f64 / open_periods as f64
                };
                (r.id.clone(), util)
            })
            .collect();
        let avg_room_utilization = if utilization_by_classroom.is_empty() {
            0.0
        } else {
            utilization_by_classroom.values().sum::<f64>() / utilization_by_classroom.len() as f64
        };

        let coverage_rate = if sessions_required == 0 {
            1.0
        } else {
            sessions_bound.min(sessions_required) as f64 / sessions_required as f64
        };
        let avg_seat_fill = if seat_fill_count == 0 {
            0.0
        } else {
            seat_fill_sum / seat_fill_count as f64
        };

        Self {
            sessions_bound,
            sessions_required,
            periods_required,
            periods_bound,
            coverage_rate,
            preference_total,
            same_day_pairs,
            avg_seat_fill,
            avg_room_utilization,
            utilization_by_classroom,
            teacher_periods,
        }
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_coverage: f64, max_same_day_pairs: u64) -> bool {
        self.coverage_rate >= min_coverage && self.same_day_pairs <= max_same_day_pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests::small_snapshot;
    use crate::domain::{Assignment, Candidate};
    use crate::models::{Preference, TimeSlot};

    #[test]
    fn test_kpi_basic() {
        let snap = small_snapshot().with_preference(Preference::preferred("T2", TimeSlot::new(1, 0, 1), 4.0));
        let model = DomainModel::build(&snap).unwrap();
        let mut a = Assignment::new(&model);
        a.bind(&model, 0, Candidate::new(0, 0, 0, 0)); // CHEM lab T1, 3 periods
        a.bind(&model, 1, Candidate::new(1, 0, 1, 1)); // MATH-K1 hall T2
        a.bind(&model, 2, Candidate::new(1, 3, 1, 1)); // same day sibling
        a.bind(&model, 3, Candidate::new(2, 0, 1, 1));
        let tt = Timetable::new("fall", model.materialize(&a), 0.0);

        let kpi = TimetableKpi::calculate(&tt, &model);
        assert_eq!(kpi.sessions_bound, 4);
        assert_eq!(kpi.sessions_required, 5);
        assert!((kpi.coverage_rate - 0.8).abs() < 1e-10);
        // two MATH offerings 2×2 plus CHEM 1×3; spring offering excluded
        assert_eq!(kpi.periods_required, 11);
        assert_eq!(kpi.periods_bound, 9);
        assert!((kpi.preference_total - 4.0).abs() < 1e-10);
        assert_eq!(kpi.same_day_pairs, 1);
        assert_eq!(kpi.teacher_periods["T1"], 3);
        assert_eq!(kpi.teacher_periods["T2"], 6);
        // 5 days × 6 periods open
        assert!((kpi.utilization_by_classroom["R2-HALL"] - 6.0 / 30.0).abs() < 1e-10);
        assert!((kpi.utilization_by_classroom["R1-LAB"] - 3.0 / 30.0).abs() < 1e-10);
        assert!(!kpi.meets_thresholds(1.0, 0));
        assert!(kpi.meets_thresholds(0.8, 1));
    }

    #[test]
    fn test_kpi_empty() {
        let model = DomainModel::build(&small_snapshot()).unwrap();
        let tt = Timetable::new("fall", Vec::new(), 0.0);
        let kpi = TimetableKpi::calculate(&tt, &model);
        assert_eq!(kpi.coverage_rate, 0.0);
        assert_eq!(kpi.avg_seat_fill, 0.0);
        assert_eq!(kpi.avg_room_utilization, 0.0);
    }
}
