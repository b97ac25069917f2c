//! REST API routes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use seaway_core::{RouteRequest, SeawayError};
use serde_json::json;

use crate::route_planner::{self, PlanError};
use crate::state::{AppState, PositionUpdate, VesselRecord};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/vessels", get(list_vessels))
        .route("/v1/vessels/:vessel_id", get(get_vessel))
        .route("/v1/positions", post(receive_position))
        .route("/v1/routes/calculate", post(calculate_route))
        .route("/v1/traffic-metrics", get(traffic_metrics))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message.into() })))
}

fn plan_error_response(err: PlanError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        PlanError::Seaway(SeawayError::SearchCancelled { .. }) | PlanError::Timeout(_) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        // NoRouteFound is reported like a bad request.
        PlanError::Seaway(_) => StatusCode::BAD_REQUEST,
        PlanError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

// === Handlers ===

async fn list_vessels(State(state): State<Arc<AppState>>) -> Json<Vec<VesselRecord>> {
    Json(state.get_all_vessels())
}

async fn get_vessel(
    State(state): State<Arc<AppState>>,
    Path(vessel_id): Path<String>,
) -> Result<Json<VesselRecord>, StatusCode> {
    state.get_vessel(&vessel_id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn receive_position(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PositionUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.apply_position(update) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({}))),
        Err(reason) => error_response(StatusCode::BAD_REQUEST, reason),
    }
}

async fn calculate_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> impl IntoResponse {
    match route_planner::plan_route(state, request.clone()).await {
        Ok(response) => {
            tracing::debug!(
                waypoints = response.route.len(),
                distance_km = response.distance_km,
                "Route calculated"
            );
            (StatusCode::OK, Json(json!(response)))
        }
        Err(err) => {
            if matches!(&err, PlanError::Seaway(e) if e.is_input_error()) {
                tracing::debug!(
                    start = ?request.start,
                    end = ?request.end,
                    "Rejected route request: {}",
                    err
                );
            } else {
                tracing::info!(
                    start = ?request.start,
                    end = ?request.end,
                    "Route request failed: {}",
                    err
                );
            }
            plan_error_response(err)
        }
    }
}

/// Metric names from `?metrics=a&metrics=b` or `?metrics=a,b`, in order.
fn metric_names(params: &[(String, String)]) -> Vec<String> {
    params
        .iter()
        .filter(|(key, _)| key == "metrics")
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

async fn traffic_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let names = metric_names(&params);
    match route_planner::traffic_metrics(state, names).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(err) => plan_error_response(err),
    }
}
