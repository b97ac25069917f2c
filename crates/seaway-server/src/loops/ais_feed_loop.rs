//! AISStream live feed ingestion.
//!
//! Subscribes to position reports inside the configured bounding box and
//! applies each one to the vessel store. Any transport error or close
//! triggers a reconnect after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::state::{AppState, PositionUpdate};

/// AIS "not available" sentinels.
const COG_NOT_AVAILABLE: f64 = 360.0;
const SOG_NOT_AVAILABLE: f64 = 102.3;
const HEADING_NOT_AVAILABLE: f64 = 511.0;

#[derive(Debug, Error)]
pub enum FeedMessageError {
    #[error("malformed feed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("position report without {0}")]
    MissingField(&'static str),
}

#[derive(Serialize)]
struct Subscription<'a> {
    #[serde(rename = "APIKey")]
    api_key: &'a str,
    #[serde(rename = "BoundingBoxes")]
    bounding_boxes: Vec<[[f64; 2]; 2]>,
    #[serde(rename = "FilterMessageTypes")]
    filter_message_types: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    message_type: Option<String>,
    #[serde(default)]
    meta_data: Option<MetaData>,
    #[serde(default)]
    message: Option<Body>,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(rename = "ShipName", default)]
    ship_name: Option<String>,
    #[serde(rename = "time_utc", default)]
    time_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "PositionReport", default)]
    position_report: Option<PositionReport>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionReport {
    #[serde(rename = "UserID")]
    user_id: Option<u64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    cog: Option<f64>,
    sog: Option<f64>,
    true_heading: Option<f64>,
}

fn subscription_message(config: &Config, api_key: &str) -> Result<String, serde_json::Error> {
    let [lat_min, lon_min, lat_max, lon_max] = config.ais_bounding_box;
    serde_json::to_string(&Subscription {
        api_key,
        bounding_boxes: vec![[[lat_min, lon_min], [lat_max, lon_max]]],
        filter_message_types: &config.ais_message_types,
    })
}

fn available(value: Option<f64>, sentinel: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0 && *v < sentinel)
}

/// AISStream stamps metadata as `2024-05-01 10:22:32.318353 +0000 UTC`.
fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches("UTC").trim();
    DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f %z")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decode one feed message. Messages other than position reports yield `None`.
pub fn parse_position_report(text: &str) -> Result<Option<PositionUpdate>, FeedMessageError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.message_type.as_deref() != Some("PositionReport") {
        return Ok(None);
    }

    let report = envelope
        .message
        .and_then(|body| body.position_report)
        .ok_or(FeedMessageError::MissingField("PositionReport"))?;
    let mmsi = report.user_id.ok_or(FeedMessageError::MissingField("UserID"))?;
    let latitude = report.latitude.ok_or(FeedMessageError::MissingField("Latitude"))?;
    let longitude = report.longitude.ok_or(FeedMessageError::MissingField("Longitude"))?;

    let (name, timestamp) = match envelope.meta_data {
        Some(meta) => (
            meta.ship_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            meta.time_utc.as_deref().and_then(parse_feed_timestamp),
        ),
        None => (None, None),
    };

    Ok(Some(PositionUpdate {
        vessel_id: mmsi.to_string(),
        name,
        latitude,
        longitude,
        course_deg: available(report.cog, COG_NOT_AVAILABLE),
        heading_deg: available(report.true_heading, HEADING_NOT_AVAILABLE),
        speed_knots: available(report.sog, SOG_NOT_AVAILABLE),
        timestamp,
    }))
}

pub async fn run_ais_feed_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let config = state.config().clone();
    let Some(api_key) = config.ais_api_key.clone() else {
        tracing::info!("AIS_API_KEY not set; live feed disabled");
        return;
    };
    let mut backoff = Backoff::fixed(Duration::from_secs(config.ais_reconnect_secs));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("AIS feed loop shutting down");
                return;
            }
            result = run_session(&state, &config, &api_key) => {
                match result {
                    Ok(received) => tracing::warn!(received, "AIS feed closed by server"),
                    Err(err) => tracing::warn!("AIS feed error: {:#}", err),
                }
            }
        }

        let delay = backoff.fail();
        tracing::info!("Reconnecting to AIS feed in {:?}", delay);
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("AIS feed loop shutting down");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// One connection lifetime. Returns the number of reports applied.
async fn run_session(state: &AppState, config: &Config, api_key: &str) -> anyhow::Result<usize> {
    let (mut socket, _) = connect_async(config.ais_feed_url.as_str()).await?;
    socket
        .send(Message::Text(subscription_message(config, api_key)?))
        .await?;
    tracing::info!(url = %config.ais_feed_url, "Subscribed to AIS feed");

    let mut received = 0usize;
    while let Some(msg) = socket.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Close(_) => break,
            _ => continue,
        };

        match parse_position_report(&text) {
            Ok(Some(update)) => {
                let vessel_id = update.vessel_id.clone();
                match state.apply_position(update) {
                    Ok(()) => received += 1,
                    Err(reason) => tracing::debug!(%vessel_id, "Rejected feed position: {}", reason),
                }
            }
            Ok(None) => {}
            Err(err) => tracing::debug!("Skipping feed message: {}", err),
        }
    }

    Ok(received)
}
