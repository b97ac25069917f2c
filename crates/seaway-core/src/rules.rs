//! Collision-risk thresholds used by the saturation estimator.

use serde::{Deserialize, Serialize};

/// Configuration for the CPA maneuver simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaturationRules {
    /// Candidate courses in degrees (clockwise from north)
    pub courses_deg: Vec<f64>,
    /// Candidate speeds in knots
    pub speeds_knots: Vec<f64>,
    /// Lookahead window for the closest approach in minutes
    pub time_window_min: f64,
    /// A closest approach below this distance is dangerous (km)
    pub min_distance_km: f64,
}

impl Default for SaturationRules {
    fn default() -> Self {
        Self {
            courses_deg: (0..12).map(|i| i as f64 * 30.0).collect(),
            speeds_knots: vec![2.0, 4.0, 6.0, 8.0, 10.0],
            time_window_min: 10.0,
            min_distance_km: 0.5,
        }
    }
}

impl SaturationRules {
    /// Size of the maneuver space (courses × speeds).
    pub fn maneuver_count(&self) -> usize {
        self.courses_deg.len() * self.speeds_knots.len()
    }

    /// Every `(course_deg, speed_knots)` pair, courses outermost.
    pub fn maneuvers(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.courses_deg
            .iter()
            .flat_map(move |course| self.speeds_knots.iter().map(move |speed| (*course, *speed)))
    }
}
