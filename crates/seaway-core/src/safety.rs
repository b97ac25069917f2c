//! Per-cell safety field fused from the four traffic metrics.

use std::collections::HashMap;

use crate::grid::GridSpec;
use crate::metrics::CellMetrics;
use crate::models::{Cell, MetricRecord, StabilityRecord};
use crate::spatial::CoordKey;

/// Score used for points that fall outside every cell.
pub const DEFAULT_SAFETY: f64 = 0.5;

/// `1 / (1 + x)`; absent or NaN input contributes 0. Negative input clamps to 0.
fn inverse_goodness(value: Option<f64>) -> f64 {
    match value.filter(|v| !v.is_nan()) {
        Some(x) => 1.0 / (1.0 + x.max(0.0)),
        None => 0.0,
    }
}

/// Fuse one cell's metrics into a score in `[0, 1]`, where 1 is safest.
///
/// The score is the mean of five goodness terms: `1 / (1 + x)` for density,
/// weighted density and the two deviations, and `1 - saturation`. An absent
/// deviation (fewer than two vessels) adds nothing, so an empty cell scores
/// 0.6; an absent saturation reads as 0.
pub fn compute_safety(
    density: Option<f64>,
    weighted_density: Option<f64>,
    sigma_speed: Option<f64>,
    sigma_course: Option<f64>,
    saturation: Option<f64>,
) -> f64 {
    let saturation = saturation.filter(|v| !v.is_nan()).unwrap_or(0.0).clamp(0.0, 1.0);
    let terms = [
        inverse_goodness(density),
        inverse_goodness(weighted_density),
        inverse_goodness(sigma_speed),
        inverse_goodness(sigma_course),
        1.0 - saturation,
    ];
    (terms.iter().sum::<f64>() / terms.len() as f64).clamp(0.0, 1.0)
}

/// Safety score per cell, addressable by rounded center or by any point
/// inside the grid.
#[derive(Debug, Clone)]
pub struct SafetyMap {
    grid: GridSpec,
    scores: Vec<f64>,
    by_center: HashMap<CoordKey, f64>,
}

impl SafetyMap {
    /// Score every cell. The metric slices must be index-aligned with `cells`.
    pub fn build(
        grid: GridSpec,
        cells: &[Cell],
        intensity: &[MetricRecord],
        intensity_speed: &[MetricRecord],
        stability: &[StabilityRecord],
        saturation: &[MetricRecord],
    ) -> Self {
        let mut scores = Vec::with_capacity(cells.len());
        let mut by_center = HashMap::with_capacity(cells.len());

        for (idx, cell) in cells.iter().enumerate() {
            let sigma = stability.get(idx);
            let score = compute_safety(
                intensity.get(idx).map(|r| r.value),
                intensity_speed.get(idx).map(|r| r.value),
                sigma.and_then(|s| s.sigma_speed),
                sigma.and_then(|s| s.sigma_course),
                saturation.get(idx).map(|r| r.value),
            );
            scores.push(score);
            by_center.insert(CoordKey::from_point(cell.center), score);
        }

        Self {
            grid,
            scores,
            by_center,
        }
    }

    pub fn from_metrics(grid: GridSpec, cells: &[Cell], metrics: &CellMetrics) -> Self {
        Self::build(
            grid,
            cells,
            &metrics.intensity,
            &metrics.intensity_speed,
            &metrics.stability,
            &metrics.saturation,
        )
    }

    /// Score of the cell whose rounded center is exactly `key`.
    pub fn score_for_center(&self, key: CoordKey) -> Option<f64> {
        self.by_center.get(&key).copied()
    }

    /// Score of the cell containing the point, if any. A point that rounds
    /// to a cell center resolves to that cell.
    pub fn cell_score(&self, lat: f64, lon: f64) -> Option<f64> {
        self.score_for_center(CoordKey::from_lat_lon(lat, lon)).or_else(|| {
            self.grid
                .cell_index(lat, lon)
                .and_then(|idx| self.scores.get(idx).copied())
        })
    }

    /// Like [`SafetyMap::cell_score`], with [`DEFAULT_SAFETY`] outside the grid.
    pub fn score_at(&self, lat: f64, lon: f64) -> f64 {
        self.cell_score(lat, lon).unwrap_or(DEFAULT_SAFETY)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
