//! Seaway CLI - command line tools for the Seaway vessel traffic system.
//!
//! Binaries:
//! - plan_route: route via a running server, or offline from a fleet file
//! - traffic_metrics: fetch per-cell traffic metrics from a server
//! - send_fleet: simulated fleet posting positions to a server

pub mod client;
pub mod sim;

pub use client::{PositionReport, SeawayClient};

/// Install the stderr log subscriber shared by the binaries.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("seaway_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
