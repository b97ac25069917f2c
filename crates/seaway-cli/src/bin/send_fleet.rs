//! Simulate a fleet on straight tracks and post its positions to a server.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use seaway_cli::sim::{random_fleet, FleetArea};
use seaway_cli::{PositionReport, SeawayClient};
use tokio::time;

/// Send simulated vessel positions to a Seaway Server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seaway Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Number of vessels
    #[arg(long, default_value_t = 25)]
    vessels: usize,

    /// RNG seed for the fleet layout
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Center latitude (default: Vladivostok approaches)
    #[arg(long, default_value_t = 43.05, allow_hyphen_values = true)]
    lat: f64,

    /// Center longitude
    #[arg(long, default_value_t = 131.9, allow_hyphen_values = true)]
    lon: f64,

    /// Spawn radius in meters
    #[arg(long, default_value_t = 15_000.0)]
    radius: f64,

    /// Duration in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,

    /// Update rate in Hz
    #[arg(long, default_value_t = 0.5)]
    rate: f64,

    /// Simulated seconds per real second
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    seaway_cli::init_tracing();
    let args = Args::parse();
    if !(args.rate > 0.0) {
        anyhow::bail!("--rate must be positive");
    }

    let area = FleetArea {
        center_lat: args.lat,
        center_lon: args.lon,
        radius_m: args.radius,
        ..FleetArea::default()
    };
    let fleet = random_fleet(&area, args.vessels, args.seed);

    println!("Sending {} vessels to {}", fleet.len(), args.url);
    println!("  Center: ({}, {}), radius {}m", args.lat, args.lon, args.radius);
    println!("  Duration: {}s, Update rate: {}Hz", args.duration, args.rate);

    let client = SeawayClient::new(&args.url);
    let start = time::Instant::now();
    let mut interval = time::interval(Duration::from_secs_f64(1.0 / args.rate));
    let mut sent = 0u64;
    let mut failed = 0u64;

    loop {
        interval.tick().await;
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > args.duration as f64 {
            break;
        }

        let sim_t = elapsed * args.time_scale;
        let now = Utc::now();
        for track in &fleet {
            let (latitude, longitude) = track.position_at(sim_t);
            let report = PositionReport {
                vessel_id: track.vessel_id.clone(),
                name: Some(track.name.clone()),
                latitude,
                longitude,
                course_deg: Some(track.course_deg),
                heading_deg: Some(track.course_deg),
                speed_knots: Some(track.speed_knots),
                timestamp: now,
            };
            match client.send_position(&report).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!(vessel = track.vessel_id.as_str(), "Position rejected: {}", err);
                }
            }
        }
        println!("[{:6.1}s] sent={} failed={}", elapsed, sent, failed);
    }

    println!("\nSimulation complete. Sent {} updates ({} failed).", sent, failed);
    Ok(())
}
