//! Uniform cell lattice over the region of interest.

use serde::{Deserialize, Serialize};

use crate::models::Cell;

/// Tolerance used when deciding whether a cell's lower edge is still below
/// the bound, so `start + n * step == end` does not emit an extra cell.
const EDGE_EPSILON: f64 = 1e-9;

/// Bounding box and step of a metrics grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub lat_start: f64,
    pub lat_end: f64,
    pub lon_start: f64,
    pub lon_end: f64,
    pub step_degrees: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            lat_start: 42.8,
            lat_end: 43.4,
            lon_start: 131.6,
            lon_end: 132.2,
            step_degrees: 0.025,
        }
    }
}

impl GridSpec {
    pub fn new(lat_start: f64, lat_end: f64, lon_start: f64, lon_end: f64, step_degrees: f64) -> Self {
        Self {
            lat_start,
            lat_end,
            lon_start,
            lon_end,
            step_degrees,
        }
    }

    /// Number of cell rows (latitude bands).
    pub fn rows(&self) -> usize {
        axis_steps(self.lat_start, self.lat_end, self.step_degrees)
    }

    /// Number of cell columns (longitude bands).
    pub fn cols(&self) -> usize {
        axis_steps(self.lon_start, self.lon_end, self.step_degrees)
    }

    pub fn cell_count(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Build every cell, latitude-major.
    pub fn cells(&self) -> Vec<Cell> {
        generate_cells(
            self.lat_start,
            self.lat_end,
            self.lon_start,
            self.lon_end,
            self.step_degrees,
        )
    }

    /// Row-major index of the cell whose half-open bounds contain the point.
    ///
    /// Points on a shared edge resolve to the cell above/right of it.
    pub fn cell_index(&self, lat: f64, lon: f64) -> Option<usize> {
        let step = self.step_degrees;
        if !step.is_finite() || step <= 0.0 || !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let row = ((lat - self.lat_start) / step).floor();
        let col = ((lon - self.lon_start) / step).floor();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        let cols = self.cols();
        if row >= self.rows() || col >= cols {
            return None;
        }
        Some(row * cols + col)
    }
}

/// Partition a bounding box into square cells of `step` degrees.
///
/// Walks latitude then longitude from the start corner. A cell is emitted
/// while its lower edge lies strictly below the bound; trailing cells are
/// never clipped, so the last row/column may extend past the bound.
pub fn generate_cells(lat_start: f64, lat_end: f64, lon_start: f64, lon_end: f64, step: f64) -> Vec<Cell> {
    let rows = axis_steps(lat_start, lat_end, step);
    let cols = axis_steps(lon_start, lon_end, step);
    let mut cells = Vec::with_capacity(rows * cols);

    for row in 0..rows {
        let lat = lat_start + row as f64 * step;
        for col in 0..cols {
            let lon = lon_start + col as f64 * step;
            cells.push(Cell::new(lat, lat + step, lon, lon + step));
        }
    }

    cells
}

fn axis_steps(start: f64, end: f64, step: f64) -> usize {
    if !start.is_finite() || !end.is_finite() || !step.is_finite() || step <= 0.0 || end <= start {
        return 0;
    }
    ((end - start) / step - EDGE_EPSILON).ceil().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_has_24_by_24_cells() {
        let grid = GridSpec::default();
        assert_eq!(grid.rows(), 24);
        assert_eq!(grid.cols(), 24);
        assert_eq!(grid.cells().len(), 576);
    }

    #[test]
    fn cells_tile_the_box_without_gaps() {
        let cells = generate_cells(10.0, 11.0, 20.0, 21.0, 0.25);
        assert_eq!(cells.len(), 16);

        for row in 0..4 {
            for col in 0..4 {
                let cell = &cells[row * 4 + col];
                assert!((cell.min_lat - (10.0 + row as f64 * 0.25)).abs() < 1e-12);
                assert!((cell.min_lon - (20.0 + col as f64 * 0.25)).abs() < 1e-12);
                if col + 1 < 4 {
                    // shared vertical edge with the next cell in the row
                    assert_eq!(cell.max_lon, cells[row * 4 + col + 1].min_lon);
                }
                if row + 1 < 4 {
                    assert_eq!(cell.max_lat, cells[(row + 1) * 4 + col].min_lat);
                }
            }
        }

        let total_area: f64 = cells
            .iter()
            .map(|c| (c.max_lat - c.min_lat) * (c.max_lon - c.min_lon))
            .sum();
        assert!((total_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_cell_overhangs_instead_of_clipping() {
        let cells = generate_cells(0.0, 1.0, 0.0, 0.3, 0.2);
        // 5 rows x 2 columns, the second column spans 0.2..0.4
        assert_eq!(cells.len(), 10);
        assert!((cells[1].max_lon - 0.4).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_produce_no_cells() {
        assert!(generate_cells(1.0, 1.0, 0.0, 1.0, 0.1).is_empty());
        assert!(generate_cells(0.0, 1.0, 0.0, 1.0, 0.0).is_empty());
        assert!(generate_cells(0.0, 1.0, 0.0, 1.0, -0.1).is_empty());
        assert!(generate_cells(2.0, 1.0, 0.0, 1.0, 0.1).is_empty());
    }

    #[test]
    fn cell_index_matches_generated_order() {
        let grid = GridSpec::default();
        let cells = grid.cells();
        let idx = grid.cell_index(43.0, 131.9).expect("inside grid");
        assert!(cells[idx].contains(43.0, 131.9));
        assert_eq!(grid.cell_index(42.0, 131.9), None);
        assert_eq!(grid.cell_index(43.0, 133.0), None);
    }
}
