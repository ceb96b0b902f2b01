//! Illuminated contour rendering
//!
//! Draws anti-aliased elevation-interval lines whose width and color vary
//! with the terrain orientation relative to a light direction. Line width
//! is interpolated between low- and high-elevation endpoints, modulated by
//! the angle between aspect and illumination, bounded so adjacent lines
//! keep a minimum gap on steep slopes and never vanish on shallow ones.

use std::f64::consts::{FRAC_PI_2, PI};

use reliefshade_core::{Error, Grid, ProgressListener, Result};
use serde::{Deserialize, Serialize};

use crate::executor::{for_each_row_chunk, ProcessingMode};
use crate::image::{mix_colors, PixelBuffer};
use crate::lowpass;

/// Anti-aliasing band width in pixels.
const AA_DIST_PX: f64 = 0.5;

/// Transparent white, written nowhere but returned for rejected samples.
const BACKGROUND_COLOR: u32 = 0x00FF_FFFF;

/// Slope magnitudes below this have no defined aspect.
const FLAT_SLOPE_EPSILON: f64 = 10e-11;

/// Parameters for illuminated contour rendering.
///
/// Line widths are in pixels. Angles are in degrees; the azimuth is a
/// compass direction, clockwise from north. Colors are packed RGB; the
/// alpha byte is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlluminatedContoursParams {
    /// Illuminated-and-shadowed lines, or shadowed lines only
    pub illuminated: bool,
    /// Color of illuminated contour lines
    pub illuminated_color: u32,
    /// Color of shadowed contour lines
    pub shadowed_color: u32,
    /// Width of the lowest shadowed lines
    pub shadow_width_low: f64,
    /// Width of the highest shadowed lines
    pub shadow_width_high: f64,
    /// Width of the lowest illuminated lines
    pub illuminated_width_low: f64,
    /// Width of the highest illuminated lines
    pub illuminated_width_high: f64,
    /// Minimum line width
    pub min_width: f64,
    /// Minimum distance between neighboring lines
    pub min_line_dist: f64,
    /// Azimuth of illumination, degrees clockwise from north
    pub azimuth: f64,
    /// Contour interval in elevation units
    pub interval: f64,
    /// A color gradient is applied within this angle around the transition
    pub gradient_angle: f64,
    /// Transition angle between illuminated and shadowed lines, usually 90
    pub transition_angle: f64,
    /// Standard deviation of the Gaussian blur applied to the elevation
    /// grid before sampling aspect
    pub aspect_gauss_blur: f64,
    /// Grid elevation minimum and maximum; computed from the elevation
    /// grid when absent
    pub grid_min_max: Option<(f32, f32)>,
    /// Execution mode for the row-chunked render
    pub mode: ProcessingMode,
}

impl Default for IlluminatedContoursParams {
    fn default() -> Self {
        Self {
            illuminated: true,
            illuminated_color: 0x00FF_FFFF,
            shadowed_color: 0x0000_0000,
            shadow_width_low: 2.0,
            shadow_width_high: 1.0,
            illuminated_width_low: 2.0,
            illuminated_width_high: 1.0,
            min_width: 0.3,
            min_line_dist: 2.0,
            azimuth: 315.0,
            interval: 100.0,
            gradient_angle: 10.0,
            transition_angle: 90.0,
            aspect_gauss_blur: 1.5,
            grid_min_max: None,
            mode: ProcessingMode::Parallel,
        }
    }
}

/// Render illuminated contour lines into `image`.
///
/// `image` dimensions must be an integer multiple (the upsampling factor)
/// of the elevation grid's; `slope_grid` holds rise/run slope values and
/// must match the elevation grid's dimensions. Aspect is sampled from a
/// low-pass filtered copy of the elevation grid.
///
/// Pixels are written only where a line is hit; everything else keeps its
/// prior contents, as do the border rows and columns. On the upsampled
/// path the observer is polled for cancellation once per source row and
/// the first chunk reports integer percentage progress; a cancelled render
/// returns `Ok` with a partially filled image.
pub fn illuminated_contours(
    image: &mut PixelBuffer,
    grid: &Grid,
    slope_grid: &Grid,
    params: &IlluminatedContoursParams,
    progress: Option<&dyn ProgressListener>,
) -> Result<()> {
    let rows = grid.rows();
    let cols = grid.cols();

    if slope_grid.rows() != rows || slope_grid.cols() != cols {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: slope_grid.rows(),
            ac: slope_grid.cols(),
        });
    }
    if image.width() % cols != 0 || image.height() != rows * (image.width() / cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: image.height(),
            ac: image.width(),
        });
    }
    if params.interval == 0.0 {
        return Err(Error::InvalidParameter {
            name: "interval",
            value: "0".into(),
            reason: "contour interval must be nonzero".into(),
        });
    }

    let scale = image.width() / cols;
    let width = image.width();
    let cell_size = grid.cell_size();
    let west = grid.west();
    let north = grid.north();

    let (grid_min, grid_max) = match params.grid_min_max {
        Some(mm) => mm,
        None => grid.min_max(),
    };

    // stabilized aspect comes from a low-pass copy of the elevation grid;
    // elevation and slope still come from the originals
    let smooth = lowpass::smooth(grid, params.aspect_gauss_blur)?;

    let shader = ContourShader::new(params, grid_min as f64, grid_max as f64);

    tracing::debug!(rows, cols, scale, mode = ?params.mode, "rendering illuminated contours");

    for_each_row_chunk(image, rows, params.mode, |range, pixels| {
        let start = range.start.max(1);
        let end = range.end.min(rows.saturating_sub(2));
        let chunk_first_image_row = range.start * scale;

        if scale == 1 {
            for row in start..end {
                for col in 1..cols - 1 {
                    let elevation = grid.value(col, row) as f64;
                    let aspect_deg = (smooth.aspect(col, row) + PI).to_degrees();
                    let slope = grid.slope(col, row);
                    let argb = shader.shade(elevation, aspect_deg, slope, cell_size);
                    if argb >> 24 != 0 {
                        pixels[(row - range.start) * width + col] = argb;
                    }
                }
            }
        } else {
            // only the first chunk of the image reports progress
            let report = start == 1 && progress.is_some();
            let sampling_dist = cell_size / scale as f64 / 100.0;

            for row in start..end {
                if let Some(p) = progress {
                    // stop rendering if the user cancelled
                    if p.is_cancelled() {
                        return;
                    }
                    if report {
                        let percent = (100.0 * row as f64 / (end - start) as f64).round() as i32;
                        p.progress(percent);
                    }
                }

                for col in 1..cols - 1 {
                    // render scale x scale sub-cells per grid cell
                    for r in 0..scale {
                        for c in 0..scale {
                            let x = west + (col as f64 + c as f64 / scale as f64) * cell_size;
                            let y = north - (row as f64 + r as f64 / scale as f64) * cell_size;
                            let elevation = grid.bilinear(x, y);
                            let aspect_deg =
                                (smooth.aspect_at(x, y, sampling_dist) + PI).to_degrees();
                            let slope = slope_grid.bilinear(x, y);
                            let argb = shader.shade(elevation, aspect_deg, slope, cell_size);
                            if argb >> 24 != 0 {
                                let image_row = row * scale + r;
                                pixels[(image_row - chunk_first_image_row) * width
                                    + col * scale
                                    + c] = argb;
                            }
                        }
                    }
                }
            }
        }
    });

    Ok(())
}

/// Per-render shading constants, bound once and shared read-only across
/// worker threads.
struct ContourShader<'a> {
    p: &'a IlluminatedContoursParams,
    /// illuminated line color with the alpha byte cleared
    illuminated_color: u32,
    /// shadowed line color with the alpha byte cleared
    shadowed_color: u32,
    /// absolute contour interval
    interval: f64,
    grid_min: f64,
    grid_max: f64,
}

impl<'a> ContourShader<'a> {
    fn new(p: &'a IlluminatedContoursParams, grid_min: f64, grid_max: f64) -> Self {
        Self {
            p,
            illuminated_color: p.illuminated_color & 0x00FF_FFFF,
            shadowed_color: p.shadowed_color & 0x00FF_FFFF,
            interval: p.interval.abs(),
            grid_min,
            grid_max,
        }
    }

    /// Shade a single sample: ARGB with zero alpha where no line is hit.
    ///
    /// `aspect_deg` is the terrain aspect in degrees from east
    /// counterclockwise; `slope` is rise/run.
    fn shade(&self, elevation: f64, aspect_deg: f64, slope: f64, cell_size: f64) -> u32 {
        if elevation.is_nan() || aspect_deg.is_nan() || slope < FLAT_SLOPE_EPSILON {
            return BACKGROUND_COLOR;
        }

        // convert the compass azimuth to a geometric angle, from east
        // counterclockwise
        let illumination_deg = 90.0 - self.p.azimuth;
        let angle_diff_deg = smallest_angle_diff(illumination_deg, aspect_deg);
        let mut angle_diff_rad = angle_diff_deg.to_radians();

        // vary the line widths with elevation
        let w = (self.grid_max - elevation) / (self.grid_max - self.grid_min);
        let shadow_width_px =
            w * (self.p.shadow_width_low - self.p.shadow_width_high) + self.p.shadow_width_high;

        // nominal line width in pixels, varying with the orientation
        // relative to the illumination direction
        let line_width_px = if self.p.illuminated {
            let transition_rad = self.p.transition_angle.to_radians();
            if angle_diff_deg > self.p.transition_angle {
                // remap into the second half of the cosine lobe
                angle_diff_rad = (angle_diff_rad - transition_rad) / (PI - transition_rad)
                    * FRAC_PI_2
                    + FRAC_PI_2;
                shadow_width_px * angle_diff_rad.cos().abs()
            } else {
                // remap into the first half of the cosine lobe
                angle_diff_rad = angle_diff_rad / transition_rad * FRAC_PI_2;
                let illuminated_width_px = w
                    * (self.p.illuminated_width_low - self.p.illuminated_width_high)
                    + self.p.illuminated_width_high;
                illuminated_width_px * angle_diff_rad.cos().abs()
            }
        } else {
            shadow_width_px * (angle_diff_rad / 2.0).sin().abs()
        };

        // vertical distance to the nearest contour interval boundary
        let mut z_dist = elevation.abs() % self.interval;
        if z_dist > self.interval / 2.0 {
            z_dist = self.interval - z_dist;
        }

        // widest possible line keeping the configured minimum distance to
        // its neighbors at this slope; each of two adjacent lines gives up
        // half of the gap
        let max_line_width = self.interval / slope - self.p.min_line_dist * cell_size / 2.0;

        // shrink too-thick lines, then let the minimum width win over the
        // minimum distance so lines don't vanish on steep shadowed slopes
        let mut line_width = max_line_width.min(line_width_px * cell_size);
        line_width = line_width.max(self.p.min_width * cell_size);
        let half_line_width = line_width / 2.0;

        // anti-aliased band along the outer border of the line, never wider
        // than the half-width itself
        let mut aa_dist = AA_DIST_PX * cell_size;
        if half_line_width < aa_dist {
            aa_dist = half_line_width;
        }

        // ground distance to the line centerline along the slope direction
        let t = z_dist / slope;

        if t > half_line_width + aa_dist {
            return BACKGROUND_COLOR;
        }
        let alpha =
            (255 - (255.0 * smoothstep(half_line_width, half_line_width + aa_dist, t)) as i32)
                as u32;

        if !self.p.illuminated
            || angle_diff_deg >= self.p.transition_angle + self.p.gradient_angle
        {
            // shadowed side
            self.shadowed_color | alpha << 24
        } else if angle_diff_deg <= self.p.transition_angle - self.p.gradient_angle {
            // illuminated side
            self.illuminated_color | alpha << 24
        } else {
            // blend across the gradient band between the two sides
            let d = self.p.transition_angle + self.p.gradient_angle - angle_diff_deg;
            let color_w = d / (2.0 * self.p.gradient_angle);
            mix_colors(
                self.shadowed_color,
                self.illuminated_color,
                alpha,
                (color_w * 255.0) as u32,
            )
        }
    }
}

/// Unsigned minimum difference between two angles in degrees, in [0, 180].
fn smallest_angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Cubic Hermite smoothstep: 0 below `edge0`, 1 above `edge1`.
fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let x = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}
