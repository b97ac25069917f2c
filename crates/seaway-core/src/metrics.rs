//! Per-cell traffic metrics derived from a fleet snapshot.
//!
//! Every function returns exactly one record per input cell, in input order.
//! Membership uses the inclusive cell bounds, so a vessel on a shared edge
//! counts toward every cell touching it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cpa::danger_fraction;
use crate::error::{SeawayError, SeawayResult};
use crate::models::{Cell, MetricRecord, StabilityRecord, VesselSnapshot};
use crate::rules::SaturationRules;
use crate::spatial::round_to;

/// Speed band width used by the speed-weighted density (m/s).
const SPEED_BAND_MPS: f64 = 10.0;

/// Selectable metric names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Vessel count per cell
    Intensity,
    /// Speed-banded vessel count per cell
    IntensitySpeed,
    /// Speed/course standard deviations
    Stability,
    /// CPA-based collision-risk estimate
    Saturation,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Intensity,
        MetricKind::IntensitySpeed,
        MetricKind::Stability,
        MetricKind::Saturation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Intensity => "intensity",
            MetricKind::IntensitySpeed => "intensity_speed",
            MetricKind::Stability => "stability",
            MetricKind::Saturation => "saturation",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| format!("unknown metric '{name}'"))
    }
}

/// Output of one metric over the whole grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSeries {
    Values(Vec<MetricRecord>),
    Stability(Vec<StabilityRecord>),
}

impl MetricSeries {
    pub fn empty() -> Self {
        MetricSeries::Values(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            MetricSeries::Values(records) => records.len(),
            MetricSeries::Stability(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn members<'a>(cell: &'a Cell, fleet: &'a [VesselSnapshot]) -> impl Iterator<Item = (usize, &'a VesselSnapshot)> + 'a {
    fleet
        .iter()
        .enumerate()
        .filter(move |(_, vessel)| cell.contains_vessel(vessel))
}

/// Number of vessels in each cell.
pub fn calculate_intensity(cells: &[Cell], fleet: &[VesselSnapshot]) -> Vec<MetricRecord> {
    cells
        .par_iter()
        .map(|cell| MetricRecord {
            cell_center: cell.center,
            value: members(cell, fleet).count() as f64,
        })
        .collect()
}

/// Vessel count weighted by speed band: each moving vessel adds
/// `floor(speed_mps / 10) + 1`, stationary vessels add nothing.
pub fn calculate_intensity_with_speed(cells: &[Cell], fleet: &[VesselSnapshot]) -> Vec<MetricRecord> {
    cells
        .par_iter()
        .map(|cell| {
            let value = members(cell, fleet)
                .map(|(_, vessel)| vessel.speed_mps())
                .filter(|speed| *speed > 0.0)
                .map(|speed| (speed / SPEED_BAND_MPS).floor() + 1.0)
                .sum();
            MetricRecord {
                cell_center: cell.center,
                value,
            }
        })
        .collect()
}

/// Population standard deviation of speed (m/s) and course (raw degrees)
/// per cell, rounded to 2 decimals. Undefined below two vessels.
pub fn calculate_stability(cells: &[Cell], fleet: &[VesselSnapshot]) -> Vec<StabilityRecord> {
    cells
        .par_iter()
        .map(|cell| {
            let (speeds, courses): (Vec<f64>, Vec<f64>) = members(cell, fleet)
                .map(|(_, vessel)| (vessel.speed_mps(), vessel.course()))
                .unzip();

            let (sigma_speed, sigma_course) = if speeds.len() >= 2 {
                (
                    Some(round_to(population_std(&speeds), 2)),
                    Some(round_to(population_std(&courses), 2)),
                )
            } else {
                (None, None)
            };

            StabilityRecord {
                cell_center: cell.center,
                sigma_speed,
                sigma_course,
            }
        })
        .collect()
}

/// Mean danger fraction of the vessels in each cell, rounded to 3 decimals.
///
/// Danger fractions are evaluated once per vessel against the whole fleet,
/// only for vessels that fall inside at least one cell.
pub fn calculate_saturation(
    cells: &[Cell],
    fleet: &[VesselSnapshot],
    rules: &SaturationRules,
) -> Vec<MetricRecord> {
    let memberships: Vec<Vec<usize>> = cells
        .par_iter()
        .map(|cell| members(cell, fleet).map(|(idx, _)| idx).collect())
        .collect();

    let mut needed = vec![false; fleet.len()];
    for idx in memberships.iter().flatten() {
        needed[*idx] = true;
    }

    let fractions: Vec<Option<f64>> = needed
        .par_iter()
        .enumerate()
        .map(|(idx, needed)| needed.then(|| danger_fraction(fleet, idx, rules)))
        .collect();

    cells
        .iter()
        .zip(memberships)
        .map(|(cell, member_ids)| {
            let values: Vec<f64> = member_ids.iter().filter_map(|idx| fractions[*idx]).collect();
            let value = if values.is_empty() {
                0.0
            } else {
                round_to(values.iter().sum::<f64>() / values.len() as f64, 3)
            };
            MetricRecord {
                cell_center: cell.center,
                value,
            }
        })
        .collect()
}

/// Compute one metric over the grid.
pub fn compute_metric(
    kind: MetricKind,
    cells: &[Cell],
    fleet: &[VesselSnapshot],
    rules: &SaturationRules,
) -> MetricSeries {
    match kind {
        MetricKind::Intensity => MetricSeries::Values(calculate_intensity(cells, fleet)),
        MetricKind::IntensitySpeed => MetricSeries::Values(calculate_intensity_with_speed(cells, fleet)),
        MetricKind::Stability => MetricSeries::Stability(calculate_stability(cells, fleet)),
        MetricKind::Saturation => MetricSeries::Values(calculate_saturation(cells, fleet, rules)),
    }
}

/// Compute the metrics named by the caller.
///
/// Unknown names map to an empty series under their own key; an empty
/// selection is rejected.
pub fn compute_selected<S: AsRef<str>>(
    names: &[S],
    cells: &[Cell],
    fleet: &[VesselSnapshot],
    rules: &SaturationRules,
) -> SeawayResult<BTreeMap<String, MetricSeries>> {
    if names.is_empty() {
        return Err(SeawayError::EmptyMetricSelection);
    }

    let mut result = BTreeMap::new();
    for name in names {
        let name = name.as_ref();
        if result.contains_key(name) {
            continue;
        }
        let series = match name.parse::<MetricKind>() {
            Ok(kind) => compute_metric(kind, cells, fleet, rules),
            Err(_) => MetricSeries::empty(),
        };
        result.insert(name.to_string(), series);
    }
    Ok(result)
}

/// All four metrics for one grid, index-aligned with the cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMetrics {
    pub intensity: Vec<MetricRecord>,
    pub intensity_speed: Vec<MetricRecord>,
    pub stability: Vec<StabilityRecord>,
    pub saturation: Vec<MetricRecord>,
}

impl CellMetrics {
    pub fn compute(cells: &[Cell], fleet: &[VesselSnapshot], rules: &SaturationRules) -> Self {
        Self {
            intensity: calculate_intensity(cells, fleet),
            intensity_speed: calculate_intensity_with_speed(cells, fleet),
            stability: calculate_stability(cells, fleet),
            saturation: calculate_saturation(cells, fleet, rules),
        }
    }
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
