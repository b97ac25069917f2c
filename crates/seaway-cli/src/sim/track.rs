//! Straight-line vessel tracks.

use seaway_core::spatial::offset_by_bearing;
use seaway_core::{VesselSnapshot, KNOTS_TO_MPS};

/// Vessel holding a constant course and speed from a start position.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightTrack {
    pub vessel_id: String,
    pub name: String,
    pub start_lat: f64,
    pub start_lon: f64,
    /// Degrees clockwise from north
    pub course_deg: f64,
    pub speed_knots: f64,
}

impl StraightTrack {
    pub fn new(
        vessel_id: impl Into<String>,
        start_lat: f64,
        start_lon: f64,
        course_deg: f64,
        speed_knots: f64,
    ) -> Self {
        let vessel_id = vessel_id.into();
        Self {
            name: format!("SIM {}", vessel_id),
            vessel_id,
            start_lat,
            start_lon,
            course_deg: course_deg.rem_euclid(360.0),
            speed_knots: speed_knots.max(0.0),
        }
    }

    /// `(lat, lon)` after `t` seconds.
    pub fn position_at(&self, t: f64) -> (f64, f64) {
        let distance_m = self.speed_knots * KNOTS_TO_MPS * t.max(0.0);
        offset_by_bearing(
            self.start_lat,
            self.start_lon,
            distance_m,
            self.course_deg.to_radians(),
        )
    }

    pub fn snapshot_at(&self, t: f64) -> VesselSnapshot {
        let (lat, lon) = self.position_at(t);
        VesselSnapshot::new(self.vessel_id.clone(), lat, lon).with_motion(self.course_deg, self.speed_knots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seaway_core::haversine_distance;

    #[test]
    fn test_track_starts_at_origin() {
        let track = StraightTrack::new("1", 43.0, 131.9, 90.0, 10.0);
        assert_eq!(track.position_at(0.0), (43.0, 131.9));
    }

    #[test]
    fn test_track_covers_speed_times_time() {
        let track = StraightTrack::new("1", 43.0, 131.9, 0.0, 10.0);
        let (lat, lon) = track.position_at(3600.0);
        let travelled = haversine_distance(43.0, 131.9, lat, lon);
        assert!((travelled - 10.0 * 1852.0).abs() < 5.0);
        assert!(lat > 43.0);
        assert!((lon - 131.9).abs() < 1e-9);
    }

    #[test]
    fn test_course_is_normalized() {
        let track = StraightTrack::new("1", 43.0, 131.9, -90.0, 5.0);
        assert_eq!(track.course_deg, 270.0);
        assert_eq!(track.snapshot_at(0.0).course_deg, Some(270.0));
    }
}
