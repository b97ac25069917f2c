//! Server configuration from environment.

use std::env;
use std::str::FromStr;

use seaway_core::{GridSpec, PolygonLandMask, RoutePlanner, RouterConfig, SaturationRules};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    pub land_geojson_path: String,
    pub land_buffer_deg: f64,
    pub grid: GridSpec,
    pub router_grid_size_deg: f64,
    /// Unbounded unless set; `max_expansions` still ends the search
    pub router_search_margin_deg: Option<f64>,
    pub router_max_expansions: usize,
    pub obstacle_buffer_deg: f64,
    pub route_timeout_ms: u64,
    pub ais_feed_url: String,
    /// Feed is disabled when unset
    pub ais_api_key: Option<String>,
    /// `[lat_min, lon_min, lat_max, lon_max]`
    pub ais_bounding_box: [f64; 4],
    pub ais_message_types: Vec<String>,
    pub ais_reconnect_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bounding_box(raw: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [lat_min, lon_min, lat_max, lon_max] if lat_min < lat_max && lon_min < lon_max => {
            Some([*lat_min, *lon_min, *lat_max, *lon_max])
        }
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default_grid = GridSpec::default();
        let default_router = RouterConfig::default();

        Self {
            server_port: env_or("SEAWAY_PORT", 3000),
            database_path: env::var("SEAWAY_DATABASE_PATH")
                .unwrap_or_else(|_| "data/seaway.db".to_string()),
            database_max_connections: env_or("SEAWAY_DATABASE_MAX_CONNECTIONS", 5),
            land_geojson_path: env::var("SEAWAY_LAND_GEOJSON")
                .unwrap_or_else(|_| "data/map.geojson".to_string()),
            land_buffer_deg: env_or("SEAWAY_LAND_BUFFER_DEG", PolygonLandMask::DEFAULT_BUFFER_DEG),
            grid: GridSpec::new(
                env_or("SEAWAY_GRID_LAT_START", default_grid.lat_start),
                env_or("SEAWAY_GRID_LAT_END", default_grid.lat_end),
                env_or("SEAWAY_GRID_LON_START", default_grid.lon_start),
                env_or("SEAWAY_GRID_LON_END", default_grid.lon_end),
                env_or("SEAWAY_GRID_STEP", default_grid.step_degrees),
            ),
            router_grid_size_deg: env_or("SEAWAY_ROUTER_GRID_SIZE", default_router.grid_size_deg),
            router_search_margin_deg: env::var("SEAWAY_ROUTER_SEARCH_MARGIN")
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .or(default_router.search_margin_deg),
            router_max_expansions: env_or("SEAWAY_ROUTER_MAX_EXPANSIONS", default_router.max_expansions),
            obstacle_buffer_deg: env_or(
                "SEAWAY_OBSTACLE_BUFFER_DEG",
                seaway_core::DEFAULT_OBSTACLE_BUFFER_DEG,
            ),
            route_timeout_ms: env_or("SEAWAY_ROUTE_TIMEOUT_MS", 30_000),
            ais_feed_url: env::var("AIS_FEED_URL")
                .unwrap_or_else(|_| "wss://stream.aisstream.io/v0/stream".to_string()),
            ais_api_key: env::var("AIS_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            ais_bounding_box: env::var("AIS_BOUNDING_BOX")
                .ok()
                .and_then(|raw| parse_bounding_box(&raw))
                .unwrap_or([39.0, 127.0, 47.0, 136.0]),
            ais_message_types: env::var("AIS_MESSAGE_TYPES")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|types| !types.is_empty())
                .unwrap_or_else(|| vec!["PositionReport".to_string()]),
            ais_reconnect_secs: env_or("AIS_RECONNECT_SECS", 5),
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            grid_size_deg: self.router_grid_size_deg,
            search_margin_deg: self.router_search_margin_deg,
            max_expansions: self.router_max_expansions,
            ..RouterConfig::default()
        }
    }

    /// Planner carrying the configured metrics grid and router settings.
    pub fn planner(&self) -> RoutePlanner {
        RoutePlanner::new(
            self.grid,
            SaturationRules::default(),
            self.router_config(),
            self.obstacle_buffer_deg,
        )
    }
}
