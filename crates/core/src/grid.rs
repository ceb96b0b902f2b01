//! Elevation grid container

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2-D elevation grid.
///
/// Values are stored row-major in an `Array2<f32>`, with row 0 at the
/// northern edge of the extent. Cells are square with side `cell_size`,
/// in the same horizontal units as `west` and `north`.
///
/// The grid is immutable for the duration of a render; generators hold a
/// shared reference and never mutate it.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Elevation values in row-major order (row, col)
    data: Array2<f32>,
    /// Side length of a square cell
    cell_size: f64,
    /// X coordinate of the western-most column
    west: f64,
    /// Y coordinate of the northern-most row
    north: f64,
}

impl Grid {
    /// Create a new grid filled with zeros.
    pub fn new(rows: usize, cols: usize, cell_size: f64, west: f64, north: f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        if !(cell_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell_size.to_string(),
                reason: "must be > 0".into(),
            });
        }
        Ok(Self {
            data: Array2::zeros((rows, cols)),
            cell_size,
            west,
            north,
        })
    }

    /// Create a grid from row-major data.
    pub fn from_vec(
        data: Vec<f32>,
        rows: usize,
        cols: usize,
        cell_size: f64,
        west: f64,
        north: f64,
    ) -> Result<Self> {
        let mut grid = Self::new(rows, cols, cell_size, west, north)?;
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        grid.data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(grid)
    }

    /// Create a grid with the same dimensions and metadata, filled with zeros.
    pub fn like(&self) -> Self {
        Self {
            data: Array2::zeros(self.data.dim()),
            cell_size: self.cell_size,
            west: self.west,
            north: self.north,
        }
    }

    // Dimensions and metadata

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Side length of a square cell
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// X coordinate of the western-most column
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Y coordinate of the northern-most row
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Y coordinate of the southern-most row
    pub fn south(&self) -> f64 {
        self.north - (self.rows() - 1) as f64 * self.cell_size
    }

    // Data access

    /// Elevation at (col, row)
    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.data[(row, col)]
    }

    /// Elevation at (col, row) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure col < self.cols() and row < self.rows()
    pub unsafe fn value_unchecked(&self, col: usize, row: usize) -> f32 {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set elevation at (col, row)
    pub fn set(&mut self, col: usize, row: usize, value: f32) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    // Sampling

    /// Bilinearly interpolated elevation at geographic coordinates.
    ///
    /// Coordinates outside the extent are clamped to the border cells.
    /// NaN cells propagate NaN into the interpolated value.
    pub fn bilinear(&self, x: f64, y: f64) -> f64 {
        let rows = self.rows();
        let cols = self.cols();

        let col_f = ((x - self.west) / self.cell_size).clamp(0.0, (cols - 1) as f64);
        let row_f = ((self.north - y) / self.cell_size).clamp(0.0, (rows - 1) as f64);

        let c0 = col_f.floor() as usize;
        let r0 = row_f.floor() as usize;
        let c1 = (c0 + 1).min(cols - 1);
        let r1 = (r0 + 1).min(rows - 1);
        let fx = col_f - c0 as f64;
        let fy = row_f - r0 as f64;

        let v00 = self.data[(r0, c0)] as f64;
        let v01 = self.data[(r0, c1)] as f64;
        let v10 = self.data[(r1, c0)] as f64;
        let v11 = self.data[(r1, c1)] as f64;

        let top = v00 + fx * (v01 - v00);
        let bottom = v10 + fx * (v11 - v10);
        top + fy * (bottom - top)
    }

    /// Terrain slope at (col, row) as rise/run.
    ///
    /// Uses central differences, falling back to one-sided differences at
    /// the grid borders.
    pub fn slope(&self, col: usize, row: usize) -> f64 {
        let rows = self.rows();
        let cols = self.cols();

        let c0 = col.saturating_sub(1);
        let c1 = (col + 1).min(cols - 1);
        let r0 = row.saturating_sub(1);
        let r1 = (row + 1).min(rows - 1);

        let dx = if c1 > c0 {
            (self.data[(row, c1)] as f64 - self.data[(row, c0)] as f64)
                / ((c1 - c0) as f64 * self.cell_size)
        } else {
            0.0
        };
        let dy = if r1 > r0 {
            (self.data[(r1, col)] as f64 - self.data[(r0, col)] as f64)
                / ((r1 - r0) as f64 * self.cell_size)
        } else {
            0.0
        };

        (dx * dx + dy * dy).sqrt()
    }

    /// Terrain aspect at (col, row) in radians, measured from east
    /// counterclockwise. Flat neighborhoods yield 0.
    pub fn aspect(&self, col: usize, row: usize) -> f64 {
        let rows = self.rows();
        let cols = self.cols();

        let w = self.data[(row, col.saturating_sub(1))] as f64;
        let e = self.data[(row, (col + 1).min(cols - 1))] as f64;
        let n = self.data[(row.saturating_sub(1), col)] as f64;
        let s = self.data[((row + 1).min(rows - 1), col)] as f64;

        (n - s).atan2(e - w)
    }

    /// Terrain aspect at geographic coordinates, estimated from four
    /// bilinear samples offset by `sampling_dist`. Radians from east
    /// counterclockwise.
    pub fn aspect_at(&self, x: f64, y: f64, sampling_dist: f64) -> f64 {
        let w = self.bilinear(x - sampling_dist, y);
        let e = self.bilinear(x + sampling_dist, y);
        let s = self.bilinear(x, y - sampling_dist);
        let n = self.bilinear(x, y + sampling_dist);
        (n - s).atan2(e - w)
    }

    /// Grid-wide minimum and maximum elevation, ignoring non-finite cells.
    ///
    /// Returns `(NaN, NaN)` when the grid contains no finite value.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in self.data.iter() {
            if !v.is_finite() {
                continue;
            }
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if min > max {
            (f32::NAN, f32::NAN)
        } else {
            (min, max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tilted_plane(rows: usize, cols: usize) -> Grid {
        // z = 10 * col, sloping down to the west
        let mut grid = Grid::new(rows, cols, 1.0, 0.0, rows as f64 - 1.0).unwrap();
        for row in 0..rows {
            for col in 0..cols {
                grid.set(col, row, 10.0 * col as f32).unwrap();
            }
        }
        grid
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(Grid::new(0, 10, 1.0, 0.0, 0.0).is_err());
        assert!(Grid::new(10, 10, 0.0, 0.0, 0.0).is_err());
        assert!(Grid::new(10, 10, -1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_bilinear_at_vertices() {
        let grid = tilted_plane(5, 5);
        // grid vertex (col 2, row 1) lies at x = 2, y = north - 1 = 3
        assert_relative_eq!(grid.bilinear(2.0, 3.0), 20.0, epsilon = 1e-9);
        // halfway between cols 2 and 3
        assert_relative_eq!(grid.bilinear(2.5, 3.0), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bilinear_clamps_outside_extent() {
        let grid = tilted_plane(5, 5);
        assert_relative_eq!(grid.bilinear(-100.0, 2.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(grid.bilinear(100.0, 2.0), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slope_of_plane() {
        let grid = tilted_plane(5, 5);
        // rise 10 per cell, run 1
        assert_relative_eq!(grid.slope(2, 2), 10.0, epsilon = 1e-9);
        // one-sided at the border, same gradient
        assert_relative_eq!(grid.slope(0, 2), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aspect_of_plane() {
        let grid = tilted_plane(5, 5);
        // elevation increases eastward: gradient points east, aspect = 0
        // (from east counterclockwise); the downhill direction is aspect + pi.
        assert_relative_eq!(grid.aspect(2, 2), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aspect_at_matches_vertex_aspect() {
        let grid = tilted_plane(9, 9);
        let a = grid.aspect(4, 4);
        let b = grid.aspect_at(4.0, grid.north() - 4.0, 0.01);
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    #[test]
    fn test_min_max_ignores_nan() {
        let mut grid = tilted_plane(3, 3);
        grid.set(1, 1, f32::NAN).unwrap();
        let (min, max) = grid.min_max();
        assert_eq!(min, 0.0);
        assert_eq!(max, 20.0);
    }

    #[test]
    fn test_min_max_all_nan() {
        let grid = Grid::from_vec(vec![f32::NAN; 4], 2, 2, 1.0, 0.0, 1.0).unwrap();
        let (min, max) = grid.min_max();
        assert!(min.is_nan() && max.is_nan());
    }
}
