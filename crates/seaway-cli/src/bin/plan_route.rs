//! Plan a route through current traffic.
//!
//! Online mode asks a running Seaway server. Offline mode (`--fleet`) runs
//! the same pipeline locally over a JSON array of vessel snapshots, with an
//! optional land GeoJSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use seaway_cli::SeawayClient;
use seaway_core::spatial::round_to;
use seaway_core::{parse_land_geojson, PolygonLandMask, Route, RoutePlanner, RouteRequest, VesselSnapshot};

/// Compute a risk-aware route between two points
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seaway Server URL (online mode)
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    #[arg(long, allow_hyphen_values = true)]
    start_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    start_lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    end_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    end_lon: f64,

    /// Planned speed in knots
    #[arg(long)]
    speed: Option<f64>,

    /// Plan offline from this fleet snapshot file instead of asking a server
    #[arg(long)]
    fleet: Option<PathBuf>,

    /// Land GeoJSON used in offline mode
    #[arg(long, requires = "fleet")]
    land: Option<PathBuf>,

    /// Land buffer in degrees (offline mode)
    #[arg(long, default_value_t = PolygonLandMask::DEFAULT_BUFFER_DEG)]
    land_buffer: f64,
}

fn plan_offline(args: &Args, request: &RouteRequest, fleet_path: &Path) -> Result<Route> {
    let text = std::fs::read_to_string(fleet_path)
        .with_context(|| format!("Failed to read fleet file {}", fleet_path.display()))?;
    let fleet: Vec<VesselSnapshot> = serde_json::from_str(&text).context("Fleet file must be a JSON array of vessels")?;
    tracing::info!(vessels = fleet.len(), "Loaded fleet snapshot");

    let land = match &args.land {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read land file {}", path.display()))?;
            let polygons = parse_land_geojson(&text)?;
            tracing::info!(polygons = polygons.len(), "Loaded land geometry");
            Some(PolygonLandMask::new(polygons, args.land_buffer))
        }
        None => None,
    };

    let route = RoutePlanner::default().plan(
        request,
        &fleet,
        land.as_ref().map(|mask| mask as &dyn seaway_core::LandMask),
    )?;
    Ok(Route {
        distance_km: round_to(route.distance_km, 2),
        estimated_time_hours: round_to(route.estimated_time_hours, 2),
        route: route.route,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    seaway_cli::init_tracing();
    let args = Args::parse();

    let mut request = RouteRequest::new([args.start_lat, args.start_lon], [args.end_lat, args.end_lon]);
    if let Some(speed) = args.speed {
        request = request.with_speed(speed);
    }

    let route = match &args.fleet {
        Some(fleet_path) => plan_offline(&args, &request, fleet_path)?,
        None => {
            let client = SeawayClient::new(&args.url);
            tracing::info!(url = client.base_url(), "Requesting route from server");
            client.plan_route(&request).await?
        }
    };

    eprintln!(
        "Route: {} waypoints, {:.2} km, {:.2} h",
        route.route.len(),
        route.distance_km,
        route.estimated_time_hours
    );
    println!("{}", serde_json::to_string_pretty(&route)?);
    Ok(())
}
