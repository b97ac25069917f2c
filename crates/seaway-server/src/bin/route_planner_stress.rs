use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seaway_core::spatial::offset_by_bearing;
use seaway_core::{obstacle_points, CoordKey, RouteRequest};
use seaway_server::config::Config;
use seaway_server::land::load_land_mask;
use seaway_server::route_planner::plan_route;
use seaway_server::state::{AppState, PositionUpdate};

struct StressRoute {
    name: &'static str,
    start: [f64; 2],
    end: [f64; 2],
}

const FLEET_SIZE: usize = 200;
const FLEET_SEED: u64 = 7;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let land = load_land_mask(&config.land_geojson_path, config.land_buffer_deg);
    let state = Arc::new(AppState::new(config.clone()).with_land(land));

    let mut rng = StdRng::seed_from_u64(FLEET_SEED);
    for i in 0..FLEET_SIZE {
        let (lat, lon) = offset_by_bearing(
            43.05,
            131.9,
            rng.random_range(0.0..15_000.0),
            rng.random_range(0.0..std::f64::consts::TAU),
        );
        let update = PositionUpdate {
            vessel_id: format!("{}", 273_000_000 + i),
            name: None,
            latitude: lat,
            longitude: lon,
            course_deg: Some(rng.random_range(0.0..360.0)),
            heading_deg: None,
            speed_knots: Some(rng.random_range(0.0..18.0)),
            timestamp: None,
        };
        if let Err(err) = state.apply_position(update) {
            println!("Skipping synthetic vessel {}: {}", i, err);
        }
    }
    println!("Fleet: {} vessels", state.vessel_count());

    let routes = vec![
        StressRoute {
            name: "Golden Horn -> Amur Bay",
            start: [43.105, 131.88],
            end: [43.08, 131.8],
        },
        StressRoute {
            name: "Eastern Bosphorus crossing",
            start: [43.06, 131.92],
            end: [43.03, 131.96],
        },
        StressRoute {
            name: "Ussuri Bay run",
            start: [43.02, 131.99],
            end: [43.1, 132.05],
        },
    ];

    let fleet = state.get_all_vessels();
    let snapshots: Vec<_> = fleet.iter().map(|record| record.snapshot.clone()).collect();
    let blocked = obstacle_points(&snapshots, config.obstacle_buffer_deg);

    for route in routes {
        println!("\n=== {} ===", route.name);
        let started = Instant::now();
        let request = RouteRequest::new(route.start, route.end).with_speed(12.0);

        match plan_route(state.clone(), request).await {
            Ok(response) => {
                println!(
                    "Result: OK | waypoints={} distance_km={:.2} eta_h={:.2} elapsed={:?}",
                    response.route.len(),
                    response.distance_km,
                    response.estimated_time_hours,
                    started.elapsed()
                );
                let hits = response
                    .route
                    .iter()
                    .filter(|point| blocked.contains(&CoordKey::from_point(**point)))
                    .count();
                if hits == 0 {
                    println!("Obstacle check: PASS");
                } else {
                    println!("Obstacle check: FAIL ({} waypoints inside vessel buffers)", hits);
                }
            }
            Err(err) => {
                println!("Result: FAIL after {:?}: {}", started.elapsed(), err);
            }
        }
    }
}
