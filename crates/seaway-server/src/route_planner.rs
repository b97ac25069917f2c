//! Server-side route planning and metrics over the live vessel store.
//!
//! Both computations are CPU-bound, so they run on the blocking pool under
//! the configured deadline. Tokio cannot abort a blocking task, so a timed
//! out job keeps its thread until it returns. Route searches watch a cancel
//! flag that is raised on timeout; metric computation is bounded by the grid
//! size and always finishes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use seaway_core::spatial::round_to;
use seaway_core::{MetricSeries, Route, RouteRequest, SeawayError, VesselStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Seaway(#[from] SeawayError),

    #[error("computation exceeded {0} ms")]
    Timeout(u64),

    #[error("computation task failed: {0}")]
    Task(String),
}

/// Route response with distance and time rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlanResponse {
    pub route: Vec<[f64; 2]>,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
}

impl From<Route> for RoutePlanResponse {
    fn from(route: Route) -> Self {
        Self {
            route: route.route,
            distance_km: round_to(route.distance_km, 2),
            estimated_time_hours: round_to(route.estimated_time_hours, 2),
        }
    }
}

/// Run `job` on the blocking pool. On timeout the flag handed to `job` is
/// raised so a cooperative job can stop early.
async fn run_blocking<T, F>(timeout_ms: u64, job: F) -> Result<T, PlanError>
where
    T: Send + 'static,
    F: FnOnce(&AtomicBool) -> Result<T, SeawayError> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let task = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || job(&cancel))
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result.map_err(PlanError::from),
        Ok(Err(join_err)) => Err(PlanError::Task(join_err.to_string())),
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            tracing::warn!(timeout_ms, "blocking computation timed out, cancelling");
            Err(PlanError::Timeout(timeout_ms))
        }
    }
}

/// Plan a route through the current fleet, honouring land geometry.
pub async fn plan_route(state: Arc<AppState>, request: RouteRequest) -> Result<RoutePlanResponse, PlanError> {
    // Reject bad input before paying for a blocking task.
    request.validate()?;

    let timeout_ms = state.config().route_timeout_ms;
    let planner = state.planner().clone();
    let land = state.land();

    let route = run_blocking(timeout_ms, move |cancel| {
        planner.plan_from_store(&request, state.as_ref(), land.as_deref(), Some(cancel))
    })
    .await?;
    Ok(route.into())
}

/// Compute the named traffic metrics over the configured grid.
pub async fn traffic_metrics(
    state: Arc<AppState>,
    names: Vec<String>,
) -> Result<BTreeMap<String, MetricSeries>, PlanError> {
    if names.is_empty() {
        return Err(SeawayError::EmptyMetricSelection.into());
    }

    let timeout_ms = state.config().route_timeout_ms;
    let fleet = state.fleet();
    let planner = state.planner().clone();

    run_blocking(timeout_ms, move |_cancel| planner.traffic_metrics(&names, &fleet)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::PositionUpdate;

    fn state_with_vessel() -> Arc<AppState> {
        let state = Arc::new(AppState::new(Config::from_env()));
        state
            .apply_position(PositionUpdate {
                vessel_id: "273350000".to_string(),
                name: None,
                latitude: 43.0,
                longitude: 131.9,
                course_deg: Some(90.0),
                heading_deg: None,
                speed_knots: Some(5.0),
                timestamp: None,
            })
            .unwrap();
        state
    }

    #[tokio::test]
    async fn route_summary_is_rounded() {
        let state = state_with_vessel();
        let response = plan_route(state, RouteRequest::new([43.05, 131.95], [43.06, 131.97]))
            .await
            .unwrap();
        assert_eq!(response.route.first(), Some(&[43.05, 131.95]));
        assert_eq!(response.distance_km, round_to(response.distance_km, 2));
        assert_eq!(response.estimated_time_hours, round_to(response.estimated_time_hours, 2));
    }

    #[tokio::test]
    async fn missing_endpoint_is_an_input_error() {
        let state = state_with_vessel();
        let request = RouteRequest {
            start: Some([43.0, 131.9]),
            end: None,
            speed_knots: None,
        };
        let err = plan_route(state, request).await.unwrap_err();
        assert!(matches!(err, PlanError::Seaway(SeawayError::InvalidCoordinates(_))));
    }

    #[tokio::test]
    async fn metrics_follow_the_configured_grid() {
        let state = state_with_vessel();
        let cells = state.config().grid.cell_count();
        let result = traffic_metrics(state, vec!["intensity".to_string()]).await.unwrap();
        assert_eq!(result["intensity"].len(), cells);
    }

    #[tokio::test]
    async fn timed_out_job_sees_its_cancel_flag() {
        let (seen_tx, seen_rx) = std::sync::mpsc::channel();
        let err = run_blocking(10, move |cancel| {
            while !cancel.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
            let _ = seen_tx.send(());
            Err::<(), _>(SeawayError::SearchCancelled { expanded: 0 })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PlanError::Timeout(10)));
        let seen = tokio::task::spawn_blocking(move || seen_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(seen.is_ok());
    }
}
