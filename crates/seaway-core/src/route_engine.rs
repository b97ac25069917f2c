//! Risk-aware A* over a lazily generated lattice of rounded coordinates.
//!
//! Nodes are `(lat, lon)` pairs rounded to three decimals. Each step moves
//! one `grid_size_deg` offset in one of eight directions; the edge cost is
//! the great-circle distance plus the local risk `1 - safety`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

use crate::error::{SeawayError, SeawayResult};
use crate::land::LandMask;
use crate::safety::{SafetyMap, DEFAULT_SAFETY};
use crate::spatial::{geodesic_km, CoordKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Lattice offset between neighbouring nodes, in degrees
    pub grid_size_deg: f64,
    /// Padding around the start/goal bounding box the search may use;
    /// `None` searches the whole globe
    #[serde(default)]
    pub search_margin_deg: Option<f64>,
    /// Node expansions before the search gives up
    pub max_expansions: usize,
    /// Safety assumed outside every metrics cell
    pub default_safety: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            grid_size_deg: 0.0008,
            search_margin_deg: None,
            max_expansions: 2_000_000,
            default_safety: DEFAULT_SAFETY,
        }
    }
}

/// Waypoints of a successful search plus how much work it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSearchResult {
    pub path: Vec<[f64; 2]>,
    pub nodes_expanded: usize,
}

/// Per-request inputs the search consults but never mutates.
pub struct RouteContext<'a> {
    pub safety: &'a SafetyMap,
    pub obstacles: &'a HashSet<CoordKey>,
    pub land: Option<&'a dyn LandMask>,
    /// Checked once per expansion; a set flag abandons the search.
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> RouteContext<'a> {
    pub fn new(safety: &'a SafetyMap, obstacles: &'a HashSet<CoordKey>, land: Option<&'a dyn LandMask>) -> Self {
        Self {
            safety,
            obstacles,
            land,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
    }
}

const NEIGHBOR_OFFSETS: [(f64, f64); 8] = [
    (-1.0, -1.0),
    (-1.0, 0.0),
    (-1.0, 1.0),
    (0.0, -1.0),
    (0.0, 1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
];

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    key: CoordKey,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score.cmp(&other.f_score).then_with(|| self.key.cmp(&other.key))
    }
}

/// Rectangle of admissible nodes in integer thousandths.
#[derive(Debug, Clone, Copy)]
struct SearchBounds {
    min: CoordKey,
    max: CoordKey,
}

impl SearchBounds {
    fn around(start: CoordKey, goal: CoordKey, margin_deg: Option<f64>) -> Self {
        let lo = CoordKey::from_lat_lon(-90.0, -180.0);
        let hi = CoordKey::from_lat_lon(90.0, 180.0);
        let Some(margin_deg) = margin_deg else {
            return Self { min: lo, max: hi };
        };
        let margin = CoordKey::from_lat_lon(margin_deg.max(0.0), margin_deg.max(0.0));
        Self {
            min: CoordKey {
                lat_e3: (start.lat_e3.min(goal.lat_e3) - margin.lat_e3).max(lo.lat_e3),
                lon_e3: (start.lon_e3.min(goal.lon_e3) - margin.lon_e3).max(lo.lon_e3),
            },
            max: CoordKey {
                lat_e3: (start.lat_e3.max(goal.lat_e3) + margin.lat_e3).min(hi.lat_e3),
                lon_e3: (start.lon_e3.max(goal.lon_e3) + margin.lon_e3).min(hi.lon_e3),
            },
        }
    }

    fn contains(&self, key: CoordKey) -> bool {
        (self.min.lat_e3..=self.max.lat_e3).contains(&key.lat_e3)
            && (self.min.lon_e3..=self.max.lon_e3).contains(&key.lon_e3)
    }
}

fn heuristic(node: CoordKey, goal: CoordKey) -> f64 {
    geodesic_km(node.to_point(), goal.to_point())
}

/// Search a path from `start` to `end`, both snapped to the lattice.
///
/// Neighbours that are obstacles, already closed, on land, or reached over
/// land are skipped. Fails with [`SeawayError::NoRouteFound`] when the open
/// set empties or the expansion budget runs out, and with
/// [`SeawayError::SearchCancelled`] once the context's cancel flag is set.
pub fn find_route(
    start: [f64; 2],
    end: [f64; 2],
    context: &RouteContext<'_>,
    config: &RouterConfig,
) -> SeawayResult<RouteSearchResult> {
    let start_key = CoordKey::from_point(start);
    let goal_key = CoordKey::from_point(end);

    if start_key == goal_key {
        return Ok(RouteSearchResult {
            path: vec![start_key.to_point()],
            nodes_expanded: 0,
        });
    }

    let bounds = SearchBounds::around(start_key, goal_key, config.search_margin_deg);
    let step = config.grid_size_deg;

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut closed_set: HashSet<CoordKey> = HashSet::new();
    let mut g_score: HashMap<CoordKey, f64> = HashMap::new();
    let mut came_from: HashMap<CoordKey, CoordKey> = HashMap::new();

    g_score.insert(start_key, 0.0);
    open_set.push(Reverse(OpenNode {
        f_score: FloatOrd(heuristic(start_key, goal_key)),
        key: start_key,
    }));

    let mut nodes_expanded = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        let current_key = current.key;
        if closed_set.contains(&current_key) {
            continue;
        }

        if current_key == goal_key {
            let path = reconstruct_path(&came_from, goal_key);
            tracing::debug!(
                nodes_expanded,
                waypoints = path.len(),
                "route search reached goal"
            );
            return Ok(RouteSearchResult { path, nodes_expanded });
        }

        if context.is_cancelled() {
            tracing::debug!(nodes_expanded, "route search cancelled");
            return Err(SeawayError::SearchCancelled {
                expanded: nodes_expanded,
            });
        }

        nodes_expanded += 1;
        if nodes_expanded > config.max_expansions {
            tracing::debug!(nodes_expanded, "route search hit expansion budget");
            return Err(SeawayError::NoRouteFound {
                expanded: nodes_expanded,
            });
        }

        closed_set.insert(current_key);
        let current_g = g_score.get(&current_key).copied().unwrap_or(f64::INFINITY);
        let current_point = current_key.to_point();

        for (d_lat, d_lon) in NEIGHBOR_OFFSETS {
            let neighbor = CoordKey::from_lat_lon(
                current_point[0] + d_lat * step,
                current_point[1] + d_lon * step,
            );
            if neighbor == current_key
                || !bounds.contains(neighbor)
                || context.obstacles.contains(&neighbor)
                || closed_set.contains(&neighbor)
            {
                continue;
            }

            let neighbor_point = neighbor.to_point();
            if let Some(land) = context.land {
                if land.contains(neighbor_point[0], neighbor_point[1])
                    || land.intersects_segment(current_point, neighbor_point)
                {
                    continue;
                }
            }

            let safety = context
                .safety
                .cell_score(neighbor_point[0], neighbor_point[1])
                .unwrap_or(config.default_safety);
            let tentative_g = current_g + geodesic_km(current_point, neighbor_point) + (1.0 - safety);

            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbor, current_key);
                g_score.insert(neighbor, tentative_g);
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative_g + heuristic(neighbor, goal_key)),
                    key: neighbor,
                }));
            }
        }
    }

    tracing::debug!(nodes_expanded, "route search exhausted open set");
    Err(SeawayError::NoRouteFound {
        expanded: nodes_expanded,
    })
}

fn reconstruct_path(came_from: &HashMap<CoordKey, CoordKey>, goal: CoordKey) -> Vec<[f64; 2]> {
    let mut path = vec![goal.to_point()];
    let mut current = goal;
    while let Some(previous) = came_from.get(&current) {
        path.push(previous.to_point());
        current = *previous;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSpec;
    use crate::land::{LandPolygon, PolygonLandMask};
    use crate::metrics::CellMetrics;
    use crate::models::{MetricRecord, StabilityRecord};
    use crate::rules::SaturationRules;
    use crate::spatial::path_length_km;

    fn quiet_map() -> SafetyMap {
        let grid = GridSpec::new(43.0, 43.05, 131.9, 131.95, 0.025);
        let cells = grid.cells();
        let metrics = CellMetrics::compute(&cells, &[], &SaturationRules::default());
        SafetyMap::from_metrics(grid, &cells, &metrics)
    }

    fn small_config() -> RouterConfig {
        RouterConfig {
            search_margin_deg: Some(0.005),
            ..RouterConfig::default()
        }
    }

    #[test]
    fn same_node_returns_single_waypoint() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let context = RouteContext::new(&safety, &obstacles, None);
        let result = find_route([43.0101, 131.9102], [43.0104, 131.9098], &context, &small_config()).unwrap();
        assert_eq!(result.path, vec![[43.01, 131.91]]);
    }

    #[test]
    fn open_water_route_connects_rounded_endpoints() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let context = RouteContext::new(&safety, &obstacles, None);
        let result = find_route([43.0101, 131.9102], [43.0204, 131.9149], &context, &small_config()).unwrap();

        let first = CoordKey::from_point(result.path[0]);
        let last = CoordKey::from_point(*result.path.last().unwrap());
        assert_eq!(first, CoordKey::from_lat_lon(43.01, 131.91));
        assert_eq!(last, CoordKey::from_lat_lon(43.02, 131.915));
        for pair in result.path.windows(2) {
            let (a, b) = (CoordKey::from_point(pair[0]), CoordKey::from_point(pair[1]));
            assert_ne!(a, b);
            assert!((a.lat_e3 - b.lat_e3).abs() <= 1);
            assert!((a.lon_e3 - b.lon_e3).abs() <= 1);
        }
    }

    #[test]
    fn search_is_deterministic() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let context = RouteContext::new(&safety, &obstacles, None);
        let config = small_config();
        let a = find_route([43.01, 131.91], [43.02, 131.93], &context, &config).unwrap();
        let b = find_route([43.01, 131.91], [43.02, 131.93], &context, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn blocked_goal_reports_no_route() {
        let safety = quiet_map();
        let obstacles: HashSet<CoordKey> = [CoordKey::from_lat_lon(43.02, 131.92)].into_iter().collect();
        let context = RouteContext::new(&safety, &obstacles, None);
        let err = find_route([43.01, 131.91], [43.02, 131.92], &context, &small_config()).unwrap_err();
        assert!(matches!(err, SeawayError::NoRouteFound { .. }));
    }

    #[test]
    fn goal_on_land_reports_no_route() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let land = PolygonLandMask::new(
            vec![LandPolygon::new(vec![
                [43.015, 131.915],
                [43.015, 131.925],
                [43.025, 131.925],
                [43.025, 131.915],
            ])],
            0.0,
        );
        let context = RouteContext::new(&safety, &obstacles, Some(&land));
        let err = find_route([43.01, 131.91], [43.02, 131.92], &context, &small_config()).unwrap_err();
        assert!(matches!(err, SeawayError::NoRouteFound { .. }));
    }

    #[test]
    fn route_detours_around_land() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        // wall between the endpoints running past the southern search edge
        let land = PolygonLandMask::new(
            vec![LandPolygon::new(vec![
                [42.99, 131.9145],
                [42.99, 131.9155],
                [43.0125, 131.9155],
                [43.0125, 131.9145],
            ])],
            0.0,
        );
        let context = RouteContext::new(&safety, &obstacles, Some(&land));
        let result = find_route([43.008, 131.911], [43.008, 131.92], &context, &small_config()).unwrap();
        for point in &result.path {
            assert!(!land.contains(point[0], point[1]));
        }
        for pair in result.path.windows(2) {
            assert!(!land.intersects_segment(pair[0], pair[1]));
        }
        assert!(result.path.iter().any(|p| p[0] > 43.0125));
    }

    #[test]
    fn expansion_budget_ends_search() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let context = RouteContext::new(&safety, &obstacles, None);
        let config = RouterConfig {
            max_expansions: 3,
            ..small_config()
        };
        let err = find_route([43.0, 131.9], [43.04, 131.94], &context, &config).unwrap_err();
        assert_eq!(err, SeawayError::NoRouteFound { expanded: 4 });
    }

    #[test]
    fn set_cancel_flag_stops_search() {
        let safety = quiet_map();
        let obstacles = HashSet::new();
        let cancel = AtomicBool::new(true);
        let context = RouteContext::new(&safety, &obstacles, None).with_cancel(&cancel);
        let err = find_route([43.0, 131.9], [43.04, 131.94], &context, &small_config()).unwrap_err();
        assert_eq!(err, SeawayError::SearchCancelled { expanded: 0 });

        cancel.store(false, AtomicOrdering::Relaxed);
        assert!(find_route([43.0, 131.9], [43.01, 131.91], &context, &small_config()).is_ok());
    }

    /// 3x3 cells of 0.01 degrees around (43.005, 131.905). Every cell is calm;
    /// the center one is saturated and crowded when `center_busy` is set.
    fn map_with_center(center_busy: bool) -> SafetyMap {
        let grid = GridSpec::new(42.99, 43.02, 131.89, 131.92, 0.01);
        let cells = grid.cells();
        let busy = |idx: usize| center_busy && idx == 4;
        let record = |idx: usize, busy_value: f64| MetricRecord {
            cell_center: cells[idx].center,
            value: if busy(idx) { busy_value } else { 0.0 },
        };
        let intensity: Vec<_> = (0..cells.len()).map(|i| record(i, 1e9)).collect();
        let saturation: Vec<_> = (0..cells.len()).map(|i| record(i, 1.0)).collect();
        let stability: Vec<_> = (0..cells.len())
            .map(|i| {
                let sigma = if busy(i) { 1e9 } else { 0.0 };
                StabilityRecord {
                    cell_center: cells[i].center,
                    sigma_speed: Some(sigma),
                    sigma_course: Some(sigma),
                }
            })
            .collect();
        SafetyMap::build(grid, &cells, &intensity, &intensity, &stability, &saturation)
    }

    fn inside_center_cell(point: &[f64; 2]) -> bool {
        point[0] > 43.0005 && point[0] < 43.0095 && point[1] > 131.9005 && point[1] < 131.9095
    }

    #[test]
    fn risky_cell_is_avoided_until_it_becomes_safe() {
        let obstacles = HashSet::new();
        let config = RouterConfig {
            search_margin_deg: None,
            max_expansions: 200_000,
            default_safety: 1.0,
            ..RouterConfig::default()
        };
        let (start, goal) = ([43.005, 131.895], [43.005, 131.915]);

        let risky = map_with_center(true);
        assert!(risky.score_at(43.005, 131.905) < 0.01);
        let context = RouteContext::new(&risky, &obstacles, None);
        let detour = find_route(start, goal, &context, &config).unwrap();
        assert!(!detour.path.iter().any(inside_center_cell));

        let calm = map_with_center(false);
        assert_eq!(calm.score_at(43.005, 131.905), 1.0);
        let context = RouteContext::new(&calm, &obstacles, None);
        let direct = find_route(start, goal, &context, &config).unwrap();
        let middle = CoordKey::from_lat_lon(43.005, 131.905);
        assert!(direct.path.iter().any(|p| CoordKey::from_point(*p) == middle));
        assert!(path_length_km(&direct.path) < path_length_km(&detour.path));
    }

    #[test]
    fn default_search_detours_beyond_the_endpoint_box() {
        // wall 16 km long between endpoints 1.6 km apart
        let grid = GridSpec::new(42.8, 43.2, 131.8, 132.0, 0.1);
        let cells = grid.cells();
        let calm: Vec<_> = cells
            .iter()
            .map(|cell| MetricRecord {
                cell_center: cell.center,
                value: 0.0,
            })
            .collect();
        let stable: Vec<_> = cells
            .iter()
            .map(|cell| StabilityRecord {
                cell_center: cell.center,
                sigma_speed: Some(0.0),
                sigma_course: Some(0.0),
            })
            .collect();
        let safety = SafetyMap::build(grid, &cells, &calm, &calm, &stable, &calm);
        let obstacles = HashSet::new();
        let land = PolygonLandMask::new(
            vec![LandPolygon::new(vec![
                [42.90, 131.9095],
                [42.90, 131.9105],
                [43.06, 131.9105],
                [43.06, 131.9095],
            ])],
            0.0,
        );
        let context = RouteContext::new(&safety, &obstacles, Some(&land));

        let config = RouterConfig::default();
        assert_eq!(config.search_margin_deg, None);
        let result = find_route([43.0, 131.90], [43.0, 131.92], &context, &config).unwrap();
        assert!(result.path.iter().any(|p| p[0] > 43.06 || p[0] < 42.90));
        for pair in result.path.windows(2) {
            assert!(!land.intersects_segment(pair[0], pair[1]));
        }

        let boxed = RouterConfig {
            search_margin_deg: Some(0.05),
            ..RouterConfig::default()
        };
        assert!(matches!(
            find_route([43.0, 131.90], [43.0, 131.92], &context, &boxed),
            Err(SeawayError::NoRouteFound { .. })
        ));
    }
}
