//! Closest point of approach between straight-line vessel tracks.
//!
//! Tracks live in a local flat-earth frame: positions in kilometres
//! (east, north), speeds in kilometres per minute, so CPA times come out in
//! minutes.

use serde::{Deserialize, Serialize};

use crate::models::{VesselSnapshot, KNOTS_TO_KMH};
use crate::rules::SaturationRules;
use crate::spatial::project_km;

/// Knots to kilometres per minute.
pub fn knots_to_km_per_min(knots: f64) -> f64 {
    knots * KNOTS_TO_KMH / 60.0
}

/// A vessel moving at constant velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub east_km: f64,
    pub north_km: f64,
    pub speed_km_min: f64,
    /// Degrees clockwise from north
    pub course_deg: f64,
}

impl Track {
    pub fn new(east_km: f64, north_km: f64, speed_km_min: f64, course_deg: f64) -> Self {
        Self {
            east_km,
            north_km,
            speed_km_min,
            course_deg,
        }
    }

    /// (east, north) velocity components.
    fn velocity(&self) -> (f64, f64) {
        let course = self.course_deg.to_radians();
        (self.speed_km_min * course.sin(), self.speed_km_min * course.cos())
    }

    fn position_at(&self, t_min: f64) -> (f64, f64) {
        let (ve, vn) = self.velocity();
        (self.east_km + ve * t_min, self.north_km + vn * t_min)
    }
}

/// Time (minutes) and distance (km) of closest approach.
///
/// Both are `+∞` when the tracks have identical velocities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    pub t_cpa_min: f64,
    pub d_cpa_km: f64,
}

impl ClosestApproach {
    /// Dangerous when the approach happens inside `[0, window]` and closer
    /// than the minimum distance.
    pub fn is_dangerous(&self, rules: &SaturationRules) -> bool {
        (0.0..=rules.time_window_min).contains(&self.t_cpa_min) && self.d_cpa_km < rules.min_distance_km
    }
}

/// Closest point of approach between `own` and `other`.
pub fn closest_approach(own: &Track, other: &Track) -> ClosestApproach {
    // Relative position and velocity of own with respect to other.
    let dpx = own.east_km - other.east_km;
    let dpy = own.north_km - other.north_km;

    let (vx1, vy1) = own.velocity();
    let (vx2, vy2) = other.velocity();
    let dvx = vx1 - vx2;
    let dvy = vy1 - vy2;

    let denom = dvx * dvx + dvy * dvy;
    if denom == 0.0 {
        return ClosestApproach {
            t_cpa_min: f64::INFINITY,
            d_cpa_km: f64::INFINITY,
        };
    }

    let t_cpa = -(dpx * dvx + dpy * dvy) / denom;
    let (x1, y1) = own.position_at(t_cpa);
    let (x2, y2) = other.position_at(t_cpa);

    ClosestApproach {
        t_cpa_min: t_cpa,
        d_cpa_km: (x1 - x2).hypot(y1 - y2),
    }
}

/// Fraction of the maneuver space that leads `fleet[own_idx]` into a
/// dangerous approach with any other vessel on its current track.
pub fn danger_fraction(fleet: &[VesselSnapshot], own_idx: usize, rules: &SaturationRules) -> f64 {
    let total = rules.maneuver_count();
    let Some(own) = fleet.get(own_idx) else {
        return 0.0;
    };
    if total == 0 || fleet.len() < 2 {
        return 0.0;
    }

    // Targets are projected once into a frame centred on the own vessel.
    let targets: Vec<Track> = fleet
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != own_idx)
        .map(|(_, target)| {
            let (east, north) = project_km(target.latitude, target.longitude, own.latitude, own.longitude);
            Track::new(east, north, knots_to_km_per_min(target.speed()), target.course())
        })
        .collect();

    let dangerous = rules
        .maneuvers()
        .filter(|(course, speed)| {
            let candidate = Track::new(0.0, 0.0, knots_to_km_per_min(*speed), *course);
            targets
                .iter()
                .any(|target| closest_approach(&candidate, target).is_dangerous(rules))
        })
        .count();

    dangerous as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_tracks_never_close() {
        let a = Track::new(0.0, 0.0, 0.3, 45.0);
        let b = Track::new(0.2, 0.0, 0.3, 45.0);
        let cpa = closest_approach(&a, &b);
        assert!(cpa.t_cpa_min.is_infinite());
        assert!(cpa.d_cpa_km.is_infinite());
        assert!(!cpa.is_dangerous(&SaturationRules::default()));
    }

    #[test]
    fn head_on_tracks_meet_inside_window() {
        // 2 km apart, closing at 0.3 km/min each -> meet after ~3.3 min
        let a = Track::new(0.0, 0.0, 0.3, 0.0);
        let b = Track::new(0.0, 2.0, 0.3, 180.0);
        let cpa = closest_approach(&a, &b);
        assert!((cpa.t_cpa_min - 2.0 / 0.6).abs() < 1e-9);
        assert!(cpa.d_cpa_km < 1e-9);
        assert!(cpa.is_dangerous(&SaturationRules::default()));
    }

    #[test]
    fn diverging_tracks_have_negative_cpa_time() {
        let a = Track::new(0.0, 0.0, 0.3, 180.0);
        let b = Track::new(0.0, 2.0, 0.3, 0.0);
        let cpa = closest_approach(&a, &b);
        assert!(cpa.t_cpa_min < 0.0);
        assert!(!cpa.is_dangerous(&SaturationRules::default()));
    }

    #[test]
    fn crossing_too_late_is_not_dangerous() {
        // 10 km apart, closing at 0.6 km/min -> meet after ~16.7 min
        let a = Track::new(0.0, 0.0, 0.3, 0.0);
        let b = Track::new(0.0, 10.0, 0.3, 180.0);
        let cpa = closest_approach(&a, &b);
        assert!(cpa.t_cpa_min > 10.0);
        assert!(!cpa.is_dangerous(&SaturationRules::default()));
    }

    #[test]
    fn lone_vessel_has_no_danger() {
        let fleet = vec![VesselSnapshot::new("A", 43.0, 131.9).with_motion(90.0, 5.0)];
        assert_eq!(danger_fraction(&fleet, 0, &SaturationRules::default()), 0.0);
    }

    #[test]
    fn stationary_neighbour_blocks_some_maneuvers() {
        // Stationary target ~1 km due north.
        let fleet = vec![
            VesselSnapshot::new("A", 43.0, 131.9),
            VesselSnapshot::new("B", 43.009, 131.9),
        ];
        let rules = SaturationRules::default();
        let fraction = danger_fraction(&fleet, 0, &rules);
        assert!(fraction > 0.0);
        assert!(fraction < 1.0);
        // Due north, 2 kn needs ~16 min to cover the 1 km; 4 kn and up arrive in time.
        let north_hits = rules
            .speeds_knots
            .iter()
            .filter(|speed| {
                let candidate = Track::new(0.0, 0.0, knots_to_km_per_min(**speed), 0.0);
                let (e, n) = project_km(43.009, 131.9, 43.0, 131.9);
                closest_approach(&candidate, &Track::new(e, n, 0.0, 0.0)).is_dangerous(&rules)
            })
            .count();
        assert_eq!(north_hits, 4);
    }
}
