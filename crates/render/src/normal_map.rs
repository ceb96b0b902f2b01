//! Normal map rendering
//!
//! Encodes per-vertex surface normals of an elevation grid into a packed
//! ARGB image. The horizontal components of the unnormalized normal come
//! from finite differences of the four-neighborhood; the vertical
//! component is a per-render constant derived from the cell size and the
//! vertical exaggeration.

use ndarray::ArrayView2;
use reliefshade_core::{Error, Grid, Result};
use serde::{Deserialize, Serialize};

use crate::executor::{for_each_row_chunk, ProcessingMode};
use crate::image::PixelBuffer;

/// Mean earth radius used to convert geographic cell sizes to meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Cell sizes below this threshold are treated as degrees, not meters.
const DEGREE_CELL_SIZE_THRESHOLD: f64 = 0.1;

/// Fallback pixel for vertices whose normal has a non-finite length
/// (NaN elevations in the neighborhood). Opaque pure blue, written as-is
/// without going through the channel assignment.
const DEGENERATE_NORMAL_COLOR: u32 = 0xFF00_00FF;

/// Output color channel carrying one normal component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    R,
    G,
    B,
}

impl Channel {
    const fn shift(self, value: u32) -> u32 {
        match self {
            Channel::R => value << 16,
            Channel::G => value << 8,
            Channel::B => value,
        }
    }
}

/// Parameters for normal map rendering.
///
/// Defaults put the x component on red, y on green and z on blue, with no
/// sign inversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalMapParams {
    /// Channel storing the x component of normals
    pub x_channel: Channel,
    /// Channel storing the y component of normals
    pub y_channel: Channel,
    /// Channel storing the z component of normals
    pub z_channel: Channel,
    /// Flip the sign of the x component before encoding
    pub invert_x: bool,
    /// Flip the sign of the y component before encoding
    pub invert_y: bool,
    /// Flip the sign of the z component before encoding
    pub invert_z: bool,
    /// Execution mode for the row-chunked render
    pub mode: ProcessingMode,
}

impl Default for NormalMapParams {
    fn default() -> Self {
        Self {
            x_channel: Channel::R,
            y_channel: Channel::G,
            z_channel: Channel::B,
            invert_x: false,
            invert_y: false,
            invert_z: false,
            mode: ProcessingMode::Parallel,
        }
    }
}

/// Render a normal map of `grid` into a packed ARGB image.
///
/// `image` must have the grid's dimensions; pass `None` to allocate one.
/// `vertical_exaggeration` scales elevation relative to horizontal
/// distance and must be positive. Cell sizes smaller than 0.1 are taken to
/// be geographic degrees and converted to meters on a sphere.
pub fn normal_map(
    grid: &Grid,
    image: Option<PixelBuffer>,
    vertical_exaggeration: f32,
    params: &NormalMapParams,
) -> Result<PixelBuffer> {
    let rows = grid.rows();
    let cols = grid.cols();

    if rows < 2 || cols < 2 {
        return Err(Error::InvalidDimensions { rows, cols });
    }
    if !(vertical_exaggeration > 0.0) {
        return Err(Error::InvalidParameter {
            name: "vertical_exaggeration",
            value: vertical_exaggeration.to_string(),
            reason: "must be > 0".into(),
        });
    }

    let mut image = match image {
        Some(image) => {
            if image.width() != cols || image.height() != rows {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: image.height(),
                    ac: image.width(),
                });
            }
            image
        }
        None => PixelBuffer::new(cols, rows)?,
    };

    // the cell size for the horizontal components of the normal vectors
    let mut cell_size = grid.cell_size();
    if cell_size < DEGREE_CELL_SIZE_THRESHOLD {
        cell_size = cell_size / 180.0 * std::f64::consts::PI * EARTH_RADIUS_M;
    }

    let normal_z = 2.0 * cell_size / vertical_exaggeration as f64;
    let encoder = NormalEncoder {
        params,
        normal_z,
        nz_sq: normal_z * normal_z,
    };

    tracing::debug!(rows, cols, mode = ?params.mode, "rendering normal map");

    let g = grid.view();
    for_each_row_chunk(&mut image, rows, params.mode, |range, pixels| {
        for row in range.clone() {
            for col in 0..cols {
                pixels[(row - range.start) * cols + col] =
                    encoder.encode_vertex(&g, col, row, cols, rows);
            }
        }
    });

    Ok(image)
}

struct NormalEncoder<'a> {
    params: &'a NormalMapParams,
    normal_z: f64,
    nz_sq: f64,
}

impl NormalEncoder<'_> {
    /// Normalize `(nx, ny, normal_z)` and pack it into an ARGB pixel.
    fn encode(&self, mut nx: f64, mut ny: f64) -> u32 {
        let len = (nx * nx + ny * ny + self.nz_sq).sqrt();
        if !len.is_finite() {
            return DEGENERATE_NORMAL_COLOR;
        }

        if self.params.invert_x {
            nx = -nx;
        }
        if self.params.invert_y {
            ny = -ny;
        }
        let nz = if self.params.invert_z {
            -self.normal_z
        } else {
            self.normal_z
        };

        // remap each component from [-1, 1] to [0, 255]
        let x = ((nx / len + 1.0) / 2.0 * 255.0).round() as u32;
        let y = ((ny / len + 1.0) / 2.0 * 255.0).round() as u32;
        let z = ((nz / len + 1.0) / 2.0 * 255.0).round() as u32;

        0xFF00_0000
            | self.params.x_channel.shift(x)
            | self.params.y_channel.shift(y)
            | self.params.z_channel.shift(z)
    }

    /// Estimate the surface normal at a grid vertex and encode it.
    ///
    /// Interior vertices use central differences `(w - e, s - n)`. Edge
    /// vertices use one-sided differences scaled by 2, corners a 3-point
    /// scheme over the two adjacent edge neighbors and the corner itself.
    fn encode_vertex(&self, g: &ArrayView2<f32>, col: usize, row: usize, cols: usize, rows: usize) -> u32 {
        if row == 0 {
            // top-left corner
            if col == 0 {
                let s = g[(1, 0)] as f64;
                let e = g[(0, 1)] as f64;
                let c = g[(0, 0)] as f64;
                return self.encode(2.0 * (e - c), 2.0 * (s - c));
            }

            // top-right corner
            if col == cols - 1 {
                let s = g[(1, cols - 1)] as f64;
                let w = g[(0, cols - 2)] as f64;
                let c = g[(0, cols - 1)] as f64;
                return self.encode(2.0 * (w - c), 2.0 * (s - c));
            }

            // somewhere in top row
            let s = g[(1, col)] as f64;
            let e = g[(0, col + 1)] as f64;
            let c = g[(0, col)] as f64;
            let w = g[(0, col - 1)] as f64;
            return self.encode(w - e, 2.0 * (s - c));
        }

        if row == rows - 1 {
            // bottom-left corner
            if col == 0 {
                let n = g[(rows - 2, 0)] as f64;
                let e = g[(rows - 1, 1)] as f64;
                let c = g[(rows - 1, 0)] as f64;
                return self.encode(2.0 * (c - e), 2.0 * (c - n));
            }

            // bottom-right corner
            if col == cols - 1 {
                let n = g[(rows - 2, cols - 1)] as f64;
                let w = g[(rows - 1, cols - 2)] as f64;
                let c = g[(rows - 1, cols - 1)] as f64;
                return self.encode(2.0 * (w - c), 2.0 * (c - n));
            }

            // center of bottom row
            let n = g[(rows - 2, col)] as f64;
            let e = g[(rows - 1, col + 1)] as f64;
            let c = g[(rows - 1, col)] as f64;
            let w = g[(rows - 1, col - 1)] as f64;
            return self.encode(w - e, 2.0 * (c - n));
        }

        if col == 0 {
            let e = g[(row, 1)] as f64;
            let c = g[(row, 0)] as f64;
            let n = g[(row - 1, 0)] as f64;
            let s = g[(row + 1, 0)] as f64;
            return self.encode(2.0 * (c - e), s - n);
        }

        if col == cols - 1 {
            let w = g[(row, cols - 2)] as f64;
            let c = g[(row, cols - 1)] as f64;
            let n = g[(row - 1, cols - 1)] as f64;
            let s = g[(row + 1, cols - 1)] as f64;
            return self.encode(2.0 * (w - c), s - n);
        }

        // interior vertex
        let nx = g[(row, col - 1)] as f64 - g[(row, col + 1)] as f64;
        let ny = g[(row + 1, col)] as f64 - g[(row - 1, col)] as f64;
        self.encode(nx, ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{alpha, blue, green, red};

    fn flat_grid(rows: usize, cols: usize, elevation: f32) -> Grid {
        Grid::from_vec(
            vec![elevation; rows * cols],
            rows,
            cols,
            1.0,
            0.0,
            rows as f64 - 1.0,
        )
        .unwrap()
    }

    fn bumpy_grid(rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::new(rows, cols, 1.0, 0.0, rows as f64 - 1.0).unwrap();
        for row in 0..rows {
            for col in 0..cols {
                let x = col as f32;
                let y = row as f32;
                grid.set(col, row, (x * 0.7).sin() * 40.0 + (y * 0.4).cos() * 25.0 + x)
                    .unwrap();
            }
        }
        grid
    }

    #[test]
    fn test_flat_grid_encodes_flat_normal() {
        let grid = flat_grid(3, 3, 100.0);
        let image = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        // x = y = 0 maps to 128, z to 255: mid-gray on R/G, full B
        for &p in image.pixels() {
            assert_eq!(p, 0xFF80_80FF);
        }
    }

    #[test]
    fn test_interior_normals_have_unit_length() {
        let grid = bumpy_grid(12, 12);
        let image = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        for row in 1..11 {
            for col in 1..11 {
                let p = image.get(col, row);
                let nx = red(p) as f64 / 255.0 * 2.0 - 1.0;
                let ny = green(p) as f64 / 255.0 * 2.0 - 1.0;
                let nz = blue(p) as f64 / 255.0 * 2.0 - 1.0;
                let len = (nx * nx + ny * ny + nz * nz).sqrt();
                // within byte-quantization tolerance
                assert!(
                    (len - 1.0).abs() < 0.02,
                    "normal ({nx}, {ny}, {nz}) at ({col}, {row}) has length {len}"
                );
            }
        }
    }

    #[test]
    fn test_channel_assignment_permutes_bytes() {
        let grid = bumpy_grid(8, 8);
        let default = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        let swapped = normal_map(
            &grid,
            None,
            1.0,
            &NormalMapParams {
                x_channel: Channel::B,
                y_channel: Channel::R,
                z_channel: Channel::G,
                ..NormalMapParams::default()
            },
        )
        .unwrap();
        for (p, q) in default.pixels().iter().zip(swapped.pixels()) {
            assert_eq!(alpha(*q), 255);
            assert_eq!(blue(*q), red(*p));
            assert_eq!(red(*q), green(*p));
            assert_eq!(green(*q), blue(*p));
        }
    }

    #[test]
    fn test_inversion_mirrors_component() {
        let grid = bumpy_grid(8, 8);
        let plain = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        let inverted = normal_map(
            &grid,
            None,
            1.0,
            &NormalMapParams {
                invert_x: true,
                ..NormalMapParams::default()
            },
        )
        .unwrap();
        for (p, q) in plain.pixels().iter().zip(inverted.pixels()) {
            // negating before the [0, 255] remap mirrors the code around 127.5;
            // rounding may shift the pair sum by one
            let sum = red(*p) as i32 + red(*q) as i32;
            assert!((sum - 255).abs() <= 1, "sum {sum}");
            assert_eq!(green(*p), green(*q));
            assert_eq!(blue(*p), blue(*q));
        }
    }

    #[test]
    fn test_nan_neighborhood_yields_sentinel() {
        let mut grid = flat_grid(5, 5, 10.0);
        grid.set(2, 2, f32::NAN).unwrap();
        let image = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        // vertices whose stencil touches the NaN cell get the sentinel
        assert_eq!(image.get(1, 2), 0xFF00_00FF);
        assert_eq!(image.get(3, 2), 0xFF00_00FF);
        assert_eq!(image.get(2, 1), 0xFF00_00FF);
        assert_eq!(image.get(2, 3), 0xFF00_00FF);
        // the interior stencil does not read the center value itself
        assert_eq!(image.get(2, 2), 0xFF80_80FF);
        // vertices away from the NaN cell are unaffected
        assert_eq!(image.get(0, 0), 0xFF80_80FF);
    }

    #[test]
    fn test_mismatched_image_is_rejected() {
        let grid = flat_grid(4, 4, 0.0);
        let image = PixelBuffer::new(5, 4).unwrap();
        assert!(normal_map(&grid, Some(image), 1.0, &NormalMapParams::default()).is_err());
    }

    #[test]
    fn test_non_positive_exaggeration_is_rejected() {
        let grid = flat_grid(4, 4, 0.0);
        assert!(normal_map(&grid, None, 0.0, &NormalMapParams::default()).is_err());
        assert!(normal_map(&grid, None, -2.0, &NormalMapParams::default()).is_err());
    }

    #[test]
    fn test_degree_cell_size_is_converted() {
        // one arc second of elevation data; with the degrees-to-meters
        // conversion a gentle slope stays near the flat encoding instead of
        // saturating the horizontal channels
        let mut grid = Grid::new(4, 4, 1.0 / 3600.0, 7.0, 46.0).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                grid.set(col, row, col as f32).unwrap();
            }
        }
        let image = normal_map(&grid, None, 1.0, &NormalMapParams::default()).unwrap();
        let p = image.get(1, 1);
        assert!(red(p) < 132 && red(p) > 120, "red = {}", red(p));
    }
}
