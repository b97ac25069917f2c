pub mod cpa;
pub mod error;
pub mod geojson;
pub mod grid;
pub mod land;
pub mod metrics;
pub mod models;
pub mod obstacles;
pub mod planner;
pub mod route_engine;
pub mod rules;
pub mod safety;
pub mod spatial;
pub mod store;

pub use cpa::{closest_approach, danger_fraction, ClosestApproach, Track};
pub use error::{SeawayError, SeawayResult};
pub use geojson::{parse_land_geojson, GeoJsonError};
pub use grid::{generate_cells, GridSpec};
pub use land::{LandMask, LandPolygon, PolygonLandMask};
pub use metrics::{
    calculate_intensity, calculate_intensity_with_speed, calculate_saturation,
    calculate_stability, compute_metric, compute_selected, CellMetrics, MetricKind, MetricSeries,
};
pub use models::{
    Cell, MetricRecord, Route, RouteRequest, StabilityRecord, VesselSnapshot,
    DEFAULT_ROUTE_SPEED_KNOTS, KNOTS_TO_KMH, KNOTS_TO_MPS,
};
pub use obstacles::{obstacle_points, DEFAULT_OBSTACLE_BUFFER_DEG};
pub use planner::RoutePlanner;
pub use route_engine::{find_route, RouteContext, RouteSearchResult, RouterConfig};
pub use rules::SaturationRules;
pub use safety::{compute_safety, SafetyMap, DEFAULT_SAFETY};
pub use spatial::{geodesic_km, haversine_distance, CoordKey};
pub use store::VesselStore;
