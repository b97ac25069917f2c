//! Fetch traffic metrics from a Seaway server and print them as JSON.

use anyhow::Result;
use clap::Parser;
use seaway_cli::SeawayClient;
use seaway_core::MetricKind;

/// Print per-cell traffic metrics
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seaway Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Metrics to fetch (repeat or comma-separate); all four when omitted
    #[arg(long = "metric", value_delimiter = ',')]
    metrics: Vec<String>,

    /// Only print cells with a non-zero value
    #[arg(long)]
    nonzero: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    seaway_cli::init_tracing();
    let args = Args::parse();

    let names = if args.metrics.is_empty() {
        MetricKind::ALL.iter().map(|kind| kind.as_str().to_string()).collect()
    } else {
        args.metrics.clone()
    };

    let client = SeawayClient::new(&args.url);
    let metrics = client.traffic_metrics(&names).await?;
    for (name, series) in &metrics {
        tracing::info!(metric = name.as_str(), cells = series.len(), "Received series");
    }

    let mut output = serde_json::to_value(&metrics)?;
    if args.nonzero {
        if let Some(map) = output.as_object_mut() {
            for series in map.values_mut() {
                if let Some(records) = series.as_array_mut() {
                    records.retain(has_nonzero_value);
                }
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn has_nonzero_value(record: &serde_json::Value) -> bool {
    ["value", "sigma_speed", "sigma_course"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(serde_json::Value::as_f64))
        .any(|value| value != 0.0)
}
