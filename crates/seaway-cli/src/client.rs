//! HTTP client for the Seaway server API.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use seaway_core::{MetricSeries, Route, RouteRequest};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/positions`.
#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    pub vessel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_knots: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for one Seaway server.
pub struct SeawayClient {
    base_url: String,
    client: reqwest::Client,
}

impl SeawayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit one position update.
    pub async fn send_position(&self, report: &PositionReport) -> Result<()> {
        let url = format!("{}/v1/positions", self.base_url);
        let response = self.client.post(&url).json(report).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Ask the server for a route.
    pub async fn plan_route(&self, request: &RouteRequest) -> Result<Route> {
        let url = format!("{}/v1/routes/calculate", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let route = ensure_success(response)
            .await?
            .json()
            .await
            .context("Malformed route response")?;
        Ok(route)
    }

    /// Fetch the named metrics. Unknown names come back as empty series.
    pub async fn traffic_metrics(&self, names: &[String]) -> Result<BTreeMap<String, MetricSeries>> {
        let url = format!("{}/v1/traffic-metrics", self.base_url);
        let query: Vec<(&str, &str)> = names.iter().map(|name| ("metrics", name.as_str())).collect();
        let response = self.client.get(&url).query(&query).send().await?;
        let metrics = ensure_success(response)
            .await?
            .json()
            .await
            .context("Malformed metrics response")?;
        Ok(metrics)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => anyhow::bail!("Server returned {}: {}", status, body.error),
        Err(_) => anyhow::bail!("Server returned {}", status),
    }
}
