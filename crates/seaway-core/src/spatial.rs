//! Spatial math for distances, local projections and coordinate keys.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the great-circle distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decimal places used to discretize routing nodes, obstacle points and
/// safety-map keys (~111 m in latitude).
pub const COORD_DECIMALS: i32 = 3;

/// Great-circle distance between two points in meters (haversine formula).
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two `[lat, lon]` points in kilometres.
pub fn geodesic_km(a: [f64; 2], b: [f64; 2]) -> f64 {
    haversine_distance(a[0], a[1], b[0], b[1]) / 1000.0
}

/// Total length of a polyline of `[lat, lon]` points in kilometres.
pub fn path_length_km(points: &[[f64; 2]]) -> f64 {
    points.windows(2).map(|pair| geodesic_km(pair[0], pair[1])).sum()
}

// ==== Local flat-earth frame ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Project a point into a local east/north frame (kilometres) centred on the
/// reference point.
pub fn project_km(lat: f64, lon: f64, ref_lat: f64, ref_lon: f64) -> (f64, f64) {
    let east = (lon - ref_lon) * meters_per_deg_lon(ref_lat).max(1.0) / 1000.0;
    let north = (lat - ref_lat) * meters_per_deg_lat(ref_lat) / 1000.0;
    (east, north)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

// ==== Rounding and discrete keys ====

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// A coordinate rounded to [`COORD_DECIMALS`] and stored as integer
/// thousandths, so it can be hashed and compared exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoordKey {
    pub lat_e3: i64,
    pub lon_e3: i64,
}

impl CoordKey {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        let factor = 10f64.powi(COORD_DECIMALS);
        Self {
            lat_e3: (lat * factor).round() as i64,
            lon_e3: (lon * factor).round() as i64,
        }
    }

    pub fn from_point(point: [f64; 2]) -> Self {
        Self::from_lat_lon(point[0], point[1])
    }

    pub fn lat(&self) -> f64 {
        self.lat_e3 as f64 / 10f64.powi(COORD_DECIMALS)
    }

    pub fn lon(&self) -> f64 {
        self.lon_e3 as f64 / 10f64.powi(COORD_DECIMALS)
    }

    pub fn to_point(self) -> [f64; 2] {
        [self.lat(), self.lon()]
    }
}

/// `true` when the pair is a finite, in-range latitude/longitude.
pub fn is_valid_lat_lon(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
