//! Gaussian low-pass filter for elevation grids
//!
//! Used by the contour renderer to stabilize aspect estimates: aspect is
//! sampled from a smoothed copy of the elevation grid while elevation and
//! slope come from the originals.

use rayon::prelude::*;
use reliefshade_core::{Error, Grid, Result};

/// Smooth a grid with a separable Gaussian kernel of the given standard
/// deviation (in cell units).
///
/// The kernel is truncated at 3σ and normalized. NaN cells stay NaN and
/// are excluded from neighbor sums; near borders and NaN cells the kernel
/// weights are renormalized over the valid taps. Dimensions and geographic
/// metadata are preserved.
///
/// `sigma == 0` returns an unfiltered copy.
pub fn smooth(grid: &Grid, sigma: f64) -> Result<Grid> {
    if sigma < 0.0 {
        return Err(Error::InvalidParameter {
            name: "sigma",
            value: sigma.to_string(),
            reason: "must be >= 0".into(),
        });
    }
    if sigma == 0.0 {
        return Ok(grid.clone());
    }

    let rows = grid.rows();
    let cols = grid.cols();
    let kernel = gaussian_kernel(sigma);
    let half = kernel.len() / 2;
    let data = grid.data();

    // Row pass
    let row_smoothed: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for col in 0..cols {
                if data[(row, col)].is_nan() {
                    continue;
                }
                let mut sum = 0.0;
                let mut wsum = 0.0;
                for (ki, &kw) in kernel.iter().enumerate() {
                    let c = col as isize + ki as isize - half as isize;
                    if c >= 0 && c < cols as isize {
                        let v = data[(row, c as usize)];
                        if !v.is_nan() {
                            sum += kw * v as f64;
                            wsum += kw;
                        }
                    }
                }
                if wsum > 0.0 {
                    out[col] = (sum / wsum) as f32;
                }
            }
            out
        })
        .collect();

    // Column pass
    let smoothed: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for col in 0..cols {
                if row_smoothed[row * cols + col].is_nan() {
                    continue;
                }
                let mut sum = 0.0;
                let mut wsum = 0.0;
                for (ki, &kw) in kernel.iter().enumerate() {
                    let r = row as isize + ki as isize - half as isize;
                    if r >= 0 && r < rows as isize {
                        let v = row_smoothed[r as usize * cols + col];
                        if !v.is_nan() {
                            sum += kw * v as f64;
                            wsum += kw;
                        }
                    }
                }
                if wsum > 0.0 {
                    out[col] = (sum / wsum) as f32;
                }
            }
            out
        })
        .collect();

    let mut result = grid.like();
    for (dst, src) in result.data_mut().iter_mut().zip(smoothed) {
        *dst = src;
    }
    Ok(result)
}

/// 1-D Gaussian kernel truncated at 3σ, normalized to sum 1.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let half = (3.0 * sigma).ceil() as usize;
    let size = 2 * half + 1;
    let denom = 2.0 * sigma * sigma;

    let mut kernel = Vec::with_capacity(size);
    for i in 0..size {
        let x = i as f64 - half as f64;
        kernel.push((-x * x / denom).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_symmetric_and_normalized() {
        let k = gaussian_kernel(1.5);
        let n = k.len();
        for i in 0..n / 2 {
            assert_relative_eq!(k[i], k[n - 1 - i], epsilon = 1e-12);
        }
        let sum: f64 = k.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        assert!(k[n / 2] >= k[0]);
    }

    #[test]
    fn test_constant_surface_unchanged() {
        let grid = Grid::from_vec(vec![42.0; 49], 7, 7, 1.0, 0.0, 6.0).unwrap();
        let smoothed = smooth(&grid, 2.0).unwrap();
        for &v in smoothed.data().iter() {
            assert_relative_eq!(v, 42.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_preserves_dimensions_and_metadata() {
        let grid = Grid::new(5, 9, 30.0, 500.0, 4000.0).unwrap();
        let smoothed = smooth(&grid, 1.0).unwrap();
        assert_eq!(smoothed.rows(), 5);
        assert_eq!(smoothed.cols(), 9);
        assert_eq!(smoothed.cell_size(), 30.0);
        assert_eq!(smoothed.west(), 500.0);
        assert_eq!(smoothed.north(), 4000.0);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let mut grid = Grid::new(4, 4, 1.0, 0.0, 3.0).unwrap();
        grid.set(2, 1, 77.0).unwrap();
        let smoothed = smooth(&grid, 0.0).unwrap();
        assert_eq!(smoothed.data(), grid.data());
    }

    #[test]
    fn test_negative_sigma_is_an_error() {
        let grid = Grid::new(4, 4, 1.0, 0.0, 3.0).unwrap();
        assert!(smooth(&grid, -1.0).is_err());
    }

    #[test]
    fn test_nan_cells_stay_nan() {
        let mut grid = Grid::from_vec(vec![10.0; 25], 5, 5, 1.0, 0.0, 4.0).unwrap();
        grid.set(2, 2, f32::NAN).unwrap();
        let smoothed = smooth(&grid, 1.0).unwrap();
        assert!(smoothed.value(2, 2).is_nan());
        // neighbors are still defined, NaN is excluded from their sums
        assert_relative_eq!(smoothed.value(1, 2), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_smoothing_flattens_a_spike() {
        let mut grid = Grid::from_vec(vec![0.0; 81], 9, 9, 1.0, 0.0, 8.0).unwrap();
        grid.set(4, 4, 100.0).unwrap();
        let smoothed = smooth(&grid, 1.5).unwrap();
        assert!(smoothed.value(4, 4) < 20.0);
        assert!(smoothed.value(4, 4) > smoothed.value(0, 0));
    }
}
