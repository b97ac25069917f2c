//! Land geometry used to keep routes at sea.
//!
//! Geometry is planar in degrees: latitude is treated as `y`, longitude as
//! `x`. Buffers are expressed in the same units.

use serde::{Deserialize, Serialize};

/// Point-containment and segment queries against land.
pub trait LandMask: Send + Sync {
    /// `true` if the `(lat, lon)` point is on land.
    fn contains(&self, lat: f64, lon: f64) -> bool;

    /// `true` if the straight segment between two `[lat, lon]` points touches land.
    fn intersects_segment(&self, a: [f64; 2], b: [f64; 2]) -> bool;
}

/// One land polygon with optional holes. Rings are `[lat, lon]` vertex lists;
/// a closing vertex equal to the first is allowed but not required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandPolygon {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl LandPolygon {
    pub fn new(exterior: Vec<[f64; 2]>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Vec<[f64; 2]>) -> Self {
        self.holes.push(hole);
        self
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<[f64; 2]>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Interior test without any buffer.
    fn covers(&self, lat: f64, lon: f64) -> bool {
        ring_contains(&self.exterior, lat, lon) && !self.holes.iter().any(|hole| ring_contains(hole, lat, lon))
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn of(ring: &[[f64; 2]], pad: f64) -> Self {
        let mut bounds = Bounds {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for [lat, lon] in ring {
            bounds.min_lat = bounds.min_lat.min(*lat);
            bounds.max_lat = bounds.max_lat.max(*lat);
            bounds.min_lon = bounds.min_lon.min(*lon);
            bounds.max_lon = bounds.max_lon.max(*lon);
        }
        bounds.min_lat -= pad;
        bounds.max_lat += pad;
        bounds.min_lon -= pad;
        bounds.max_lon += pad;
        bounds
    }

    fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    fn overlaps_segment(&self, a: [f64; 2], b: [f64; 2]) -> bool {
        a[0].max(b[0]) >= self.min_lat
            && a[0].min(b[0]) <= self.max_lat
            && a[1].max(b[1]) >= self.min_lon
            && a[1].min(b[1]) <= self.max_lon
    }
}

/// Land as a set of polygons grown by a planar buffer.
#[derive(Debug, Clone)]
pub struct PolygonLandMask {
    polygons: Vec<LandPolygon>,
    bounds: Vec<Bounds>,
    buffer_deg: f64,
}

impl PolygonLandMask {
    /// Default buffer around the coastline, in degrees.
    pub const DEFAULT_BUFFER_DEG: f64 = 0.001;

    /// Polygons with fewer than three vertices are dropped.
    pub fn new(polygons: Vec<LandPolygon>, buffer_deg: f64) -> Self {
        let buffer_deg = if buffer_deg.is_finite() { buffer_deg.max(0.0) } else { 0.0 };
        let polygons: Vec<LandPolygon> = polygons.into_iter().filter(|p| p.exterior.len() >= 3).collect();
        let bounds = polygons.iter().map(|p| Bounds::of(&p.exterior, buffer_deg)).collect();
        Self {
            polygons,
            bounds,
            buffer_deg,
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn buffer_deg(&self) -> f64 {
        self.buffer_deg
    }

    fn candidates(&self) -> impl Iterator<Item = (&LandPolygon, &Bounds)> {
        self.polygons.iter().zip(self.bounds.iter())
    }
}

impl LandMask for PolygonLandMask {
    fn contains(&self, lat: f64, lon: f64) -> bool {
        self.candidates().any(|(polygon, bounds)| {
            bounds.contains(lat, lon)
                && (polygon.covers(lat, lon)
                    || polygon
                        .rings()
                        .any(|ring| edges(ring).any(|(p, q)| point_segment_distance([lat, lon], p, q) <= self.buffer_deg)))
        })
    }

    fn intersects_segment(&self, a: [f64; 2], b: [f64; 2]) -> bool {
        if self.contains(a[0], a[1]) || self.contains(b[0], b[1]) {
            return true;
        }
        self.candidates().any(|(polygon, bounds)| {
            bounds.overlaps_segment(a, b)
                && polygon
                    .rings()
                    .any(|ring| edges(ring).any(|(p, q)| segment_distance(a, b, p, q) <= self.buffer_deg))
        })
    }
}

fn edges(ring: &[[f64; 2]]) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Even-odd ray cast.
fn ring_contains(ring: &[[f64; 2]], lat: f64, lon: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [yi, xi] = ring[i];
        let [yj, xj] = ring[j];
        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn point_segment_distance(point: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dy, dx) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((point[0] - a[0]) * dy + (point[1] - a[1]) * dx) / len_sq).clamp(0.0, 1.0)
    };
    let closest = [a[0] + t * dy, a[1] + t * dx];
    (point[0] - closest[0]).hypot(point[1] - closest[1])
}

fn orientation(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[1] - a[1]) * (c[0] - a[0]) - (b[0] - a[0]) * (c[1] - a[1])
}

fn segments_cross(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> bool {
    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Minimum planar distance between segments `ab` and `cd`.
fn segment_distance(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    if segments_cross(a, b, c, d) {
        return 0.0;
    }
    point_segment_distance(a, c, d)
        .min(point_segment_distance(b, c, d))
        .min(point_segment_distance(c, a, b))
        .min(point_segment_distance(d, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn island() -> LandPolygon {
        LandPolygon::new(vec![[43.0, 131.9], [43.0, 132.0], [43.1, 132.0], [43.1, 131.9]])
    }

    #[test]
    fn ray_cast_handles_inside_and_outside() {
        let mask = PolygonLandMask::new(vec![island()], 0.0);
        assert!(mask.contains(43.05, 131.95));
        assert!(!mask.contains(43.2, 131.95));
        assert!(!mask.contains(43.05, 132.1));
    }

    #[test]
    fn buffer_grows_the_coastline() {
        let bare = PolygonLandMask::new(vec![island()], 0.0);
        let buffered = PolygonLandMask::new(vec![island()], 0.001);
        assert!(!bare.contains(43.1005, 131.95));
        assert!(buffered.contains(43.1005, 131.95));
        assert!(!buffered.contains(43.102, 131.95));
    }

    #[test]
    fn holes_are_water() {
        let lagoon = vec![[43.04, 131.94], [43.04, 131.96], [43.06, 131.96], [43.06, 131.94]];
        let mask = PolygonLandMask::new(vec![island().with_hole(lagoon)], 0.001);
        assert!(!mask.contains(43.05, 131.95));
        // just inside the lagoon shore, within the buffer
        assert!(mask.contains(43.0405, 131.95));
        assert!(mask.contains(43.02, 131.95));
    }

    #[test]
    fn segment_crossing_land_is_detected() {
        let mask = PolygonLandMask::new(vec![island()], 0.0);
        // both ends at sea, passes straight through
        assert!(mask.intersects_segment([42.95, 131.95], [43.15, 131.95]));
        // runs alongside
        assert!(!mask.intersects_segment([42.95, 131.85], [43.15, 131.85]));
        // ends on land
        assert!(mask.intersects_segment([42.95, 131.95], [43.05, 131.95]));
    }

    #[test]
    fn degenerate_polygons_are_ignored() {
        let mask = PolygonLandMask::new(vec![LandPolygon::new(vec![[43.0, 131.9], [43.1, 132.0]])], 0.01);
        assert_eq!(mask.polygon_count(), 0);
        assert!(!mask.contains(43.05, 131.95));
    }
}
