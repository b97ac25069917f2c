//! Seeded random fleets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seaway_core::spatial::offset_by_bearing;

use super::StraightTrack;

/// Circular area vessels are spawned in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetArea {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_m: f64,
    pub max_speed_knots: f64,
}

impl Default for FleetArea {
    /// Approaches to Vladivostok.
    fn default() -> Self {
        Self {
            center_lat: 43.05,
            center_lon: 131.9,
            radius_m: 15_000.0,
            max_speed_knots: 18.0,
        }
    }
}

/// `count` straight tracks with random start, course and speed.
/// The same seed always yields the same fleet.
pub fn random_fleet(area: &FleetArea, count: usize, seed: u64) -> Vec<StraightTrack> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            // sqrt keeps the spawn density uniform over the disc
            let distance_m = area.radius_m * rng.random::<f64>().sqrt();
            let bearing = rng.random_range(0.0..std::f64::consts::TAU);
            let (lat, lon) = offset_by_bearing(area.center_lat, area.center_lon, distance_m, bearing);
            let course = rng.random_range(0.0..360.0);
            let speed = rng.random_range(0.0..=area.max_speed_knots.max(0.0));
            StraightTrack::new(format!("{}", 900_000_000 + i), lat, lon, course, speed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seaway_core::haversine_distance;

    #[test]
    fn test_fleet_is_reproducible() {
        let area = FleetArea::default();
        assert_eq!(random_fleet(&area, 20, 42), random_fleet(&area, 20, 42));
        assert_ne!(random_fleet(&area, 20, 42), random_fleet(&area, 20, 43));
    }

    #[test]
    fn test_fleet_stays_inside_area() {
        let area = FleetArea::default();
        let fleet = random_fleet(&area, 100, 1);
        assert_eq!(fleet.len(), 100);
        for track in &fleet {
            let distance = haversine_distance(area.center_lat, area.center_lon, track.start_lat, track.start_lon);
            assert!(distance <= area.radius_m + 1.0);
            assert!(track.speed_knots <= area.max_speed_knots);
            assert!((0.0..360.0).contains(&track.course_deg));
        }
    }

    #[test]
    fn test_vessel_ids_are_unique() {
        let fleet = random_fleet(&FleetArea::default(), 10, 3);
        let ids: std::collections::HashSet<_> = fleet.iter().map(|t| t.vessel_id.as_str()).collect();
        assert_eq!(ids.len(), 10);
    }
}
