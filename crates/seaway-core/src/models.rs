//! Core data models for the Seaway system.

use serde::{Deserialize, Serialize};

use crate::error::{SeawayError, SeawayResult};
use crate::spatial::is_valid_lat_lon;

/// Knots to meters per second.
pub const KNOTS_TO_MPS: f64 = 0.514444;
/// Knots to kilometres per hour.
pub const KNOTS_TO_KMH: f64 = 1.852;
/// Requested speed used when a routing request does not carry one.
pub const DEFAULT_ROUTE_SPEED_KNOTS: f64 = 10.0;

/// Most recent known position of a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselSnapshot {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Course over ground, degrees clockwise from north
    #[serde(default)]
    pub course_deg: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    /// Speed over ground in knots
    #[serde(default)]
    pub speed_knots: Option<f64>,
}

impl VesselSnapshot {
    /// Create a snapshot with only a position; course and speed read as 0.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            course_deg: None,
            heading_deg: None,
            speed_knots: None,
        }
    }

    /// Set course and speed.
    pub fn with_motion(mut self, course_deg: f64, speed_knots: f64) -> Self {
        self.course_deg = Some(course_deg);
        self.speed_knots = Some(speed_knots);
        self
    }

    pub fn course(&self) -> f64 {
        self.course_deg.filter(|value| value.is_finite()).unwrap_or(0.0)
    }

    pub fn speed(&self) -> f64 {
        self.speed_knots.filter(|value| value.is_finite()).unwrap_or(0.0)
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed() * KNOTS_TO_MPS
    }
}

/// One cell of the metrics grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    /// `[lat, lon]` midpoint of the bounds
    pub center: [f64; 2],
}

impl Cell {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            center: [(min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0],
        }
    }

    /// Inclusive bounds test on both axes.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }

    pub fn contains_vessel(&self, vessel: &VesselSnapshot) -> bool {
        self.contains(vessel.latitude, vessel.longitude)
    }
}

/// Scalar metric value for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub cell_center: [f64; 2],
    pub value: f64,
}

/// Kinematic stability for one cell; both deviations are `None` with fewer
/// than two vessels in the cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityRecord {
    pub cell_center: [f64; 2],
    pub sigma_speed: Option<f64>,
    pub sigma_course: Option<f64>,
}

/// Routing request as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    /// `[lat, lon]`
    pub start: Option<[f64; 2]>,
    /// `[lat, lon]`
    pub end: Option<[f64; 2]>,
    #[serde(default)]
    pub speed_knots: Option<f64>,
}

impl RouteRequest {
    pub fn new(start: [f64; 2], end: [f64; 2]) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            speed_knots: None,
        }
    }

    pub fn with_speed(mut self, speed_knots: f64) -> Self {
        self.speed_knots = Some(speed_knots);
        self
    }

    /// Validate the request and return `(start, end, speed_knots)`.
    pub fn validate(&self) -> SeawayResult<([f64; 2], [f64; 2], f64)> {
        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(SeawayError::InvalidCoordinates(
                    "start and end are required".to_string(),
                ))
            }
        };
        for (label, point) in [("start", start), ("end", end)] {
            if !is_valid_lat_lon(point[0], point[1]) {
                return Err(SeawayError::InvalidCoordinates(format!(
                    "{label} [{}, {}] is out of range",
                    point[0], point[1]
                )));
            }
        }
        let speed = self.speed_knots.unwrap_or(DEFAULT_ROUTE_SPEED_KNOTS);
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SeawayError::InvalidSpeed(speed));
        }
        Ok((start, end, speed))
    }
}

/// A computed route and its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// `[lat, lon]` waypoints from the rounded start to the rounded end
    pub route: Vec<[f64; 2]>,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
}

impl Route {
    /// Assemble the summary for a waypoint sequence at the given speed.
    pub fn from_waypoints(route: Vec<[f64; 2]>, speed_knots: f64) -> Self {
        let distance_km = crate::spatial::path_length_km(&route);
        Self {
            route,
            distance_km,
            estimated_time_hours: distance_km / (speed_knots * KNOTS_TO_KMH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_motion_reads_as_zero() {
        let vessel = VesselSnapshot::new("273", 43.0, 131.9);
        assert_eq!(vessel.course(), 0.0);
        assert_eq!(vessel.speed(), 0.0);
        assert_eq!(vessel.speed_mps(), 0.0);
    }

    #[test]
    fn cell_bounds_are_inclusive() {
        let cell = Cell::new(43.0, 43.025, 131.9, 131.925);
        assert!(cell.contains(43.0, 131.9));
        assert!(cell.contains(43.025, 131.925));
        assert!(!cell.contains(43.0251, 131.91));
        assert!((cell.center[0] - 43.0125).abs() < 1e-9);
        assert!((cell.center[1] - 131.9125).abs() < 1e-9);
    }

    #[test]
    fn route_request_requires_both_endpoints() {
        let request = RouteRequest {
            start: Some([43.0, 131.9]),
            end: None,
            speed_knots: None,
        };
        assert!(matches!(
            request.validate(),
            Err(SeawayError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn route_request_defaults_speed_and_rejects_zero() {
        let request = RouteRequest::new([43.0, 131.9], [43.1, 132.0]);
        let (_, _, speed) = request.validate().unwrap();
        assert_eq!(speed, DEFAULT_ROUTE_SPEED_KNOTS);

        let stopped = request.with_speed(0.0);
        assert_eq!(stopped.validate(), Err(SeawayError::InvalidSpeed(0.0)));
    }

    #[test]
    fn route_summary_uses_requested_speed() {
        let route = Route::from_waypoints(vec![[43.0, 131.9], [43.1, 131.9]], 10.0);
        assert!((route.distance_km - 11.12).abs() < 0.01);
        assert!((route.estimated_time_hours - route.distance_km / 18.52).abs() < 1e-12);
    }
}
