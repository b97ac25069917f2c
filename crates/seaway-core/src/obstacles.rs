//! Hard no-go points around currently tracked vessels.

use std::collections::HashSet;

use crate::models::VesselSnapshot;
use crate::spatial::CoordKey;

/// Offset of the obstacle buffer around a vessel, in degrees.
pub const DEFAULT_OBSTACLE_BUFFER_DEG: f64 = 0.01;

/// Discretized points around each vessel's latest position.
///
/// For every vessel the rounded position is offset by `{-buffer, 0, +buffer}`
/// on both axes, giving a 3×3 block of rounded coordinates.
pub fn obstacle_points(fleet: &[VesselSnapshot], buffer_deg: f64) -> HashSet<CoordKey> {
    let offsets = [-buffer_deg, 0.0, buffer_deg];
    let mut points = HashSet::with_capacity(fleet.len() * 9);

    for vessel in fleet {
        if !vessel.latitude.is_finite() || !vessel.longitude.is_finite() {
            continue;
        }
        let center = CoordKey::from_lat_lon(vessel.latitude, vessel.longitude);
        for d_lat in offsets {
            for d_lon in offsets {
                points.insert(CoordKey::from_lat_lon(center.lat() + d_lat, center.lon() + d_lon));
            }
        }
    }

    points
}
