//! End-to-end routing pipeline: grid, metrics, safety field, obstacles, A*.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use crate::error::SeawayResult;
use crate::grid::GridSpec;
use crate::land::LandMask;
use crate::metrics::{compute_selected, CellMetrics, MetricSeries};
use crate::models::{Route, RouteRequest, VesselSnapshot};
use crate::obstacles::{obstacle_points, DEFAULT_OBSTACLE_BUFFER_DEG};
use crate::route_engine::{find_route, RouteContext, RouterConfig};
use crate::rules::SaturationRules;
use crate::safety::SafetyMap;
use crate::store::VesselStore;

/// Everything a routing or metrics request needs besides the fleet itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlanner {
    pub grid: GridSpec,
    pub rules: SaturationRules,
    pub router: RouterConfig,
    pub obstacle_buffer_deg: f64,
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            rules: SaturationRules::default(),
            router: RouterConfig::default(),
            obstacle_buffer_deg: DEFAULT_OBSTACLE_BUFFER_DEG,
        }
    }
}

impl RoutePlanner {
    pub fn new(grid: GridSpec, rules: SaturationRules, router: RouterConfig, obstacle_buffer_deg: f64) -> Self {
        Self {
            grid,
            rules,
            router,
            obstacle_buffer_deg,
        }
    }

    /// Build the safety field for the current fleet.
    pub fn safety_map(&self, fleet: &[VesselSnapshot]) -> SafetyMap {
        let cells = self.grid.cells();
        let metrics = CellMetrics::compute(&cells, fleet, &self.rules);
        SafetyMap::from_metrics(self.grid, &cells, &metrics)
    }

    /// Plan a route for `request` through the given fleet.
    pub fn plan(
        &self,
        request: &RouteRequest,
        fleet: &[VesselSnapshot],
        land: Option<&dyn LandMask>,
    ) -> SeawayResult<Route> {
        self.plan_cancellable(request, fleet, land, None)
    }

    /// Snapshot the store's fleet and plan through it. The search stops with
    /// `SearchCancelled` once `cancel` is set; metric and safety computation
    /// before the search always runs to completion.
    pub fn plan_from_store<S: VesselStore + ?Sized>(
        &self,
        request: &RouteRequest,
        store: &S,
        land: Option<&dyn LandMask>,
        cancel: Option<&AtomicBool>,
    ) -> SeawayResult<Route> {
        self.plan_cancellable(request, &store.fleet(), land, cancel)
    }

    fn plan_cancellable(
        &self,
        request: &RouteRequest,
        fleet: &[VesselSnapshot],
        land: Option<&dyn LandMask>,
        cancel: Option<&AtomicBool>,
    ) -> SeawayResult<Route> {
        let (start, end, speed_knots) = request.validate()?;

        let safety = self.safety_map(fleet);
        let obstacles = obstacle_points(fleet, self.obstacle_buffer_deg);
        let mut context = RouteContext::new(&safety, &obstacles, land);
        if let Some(flag) = cancel {
            context = context.with_cancel(flag);
        }

        let result = find_route(start, end, &context, &self.router)?;
        Ok(Route::from_waypoints(result.path, speed_knots))
    }

    /// Compute the named metrics over this planner's grid.
    pub fn traffic_metrics<N: AsRef<str>>(
        &self,
        names: &[N],
        fleet: &[VesselSnapshot],
    ) -> SeawayResult<BTreeMap<String, MetricSeries>> {
        compute_selected(names, &self.grid.cells(), fleet, &self.rules)
    }
}
