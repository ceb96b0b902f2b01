//! # reliefshade render
//!
//! Shaded-relief raster renderers for digital elevation models.
//!
//! This crate provides:
//! - [`normal_map`]: packed-color encoding of per-vertex surface normals
//! - [`illuminated_contours`]: anti-aliased, light-modulated elevation
//!   contour lines
//! - [`executor`]: deterministic row-chunked parallel execution shared by
//!   both renderers
//! - [`lowpass`]: Gaussian low-pass filtering of elevation grids
//!
//! Both renderers are synchronous, blocking calls: they partition the
//! output image into contiguous row chunks, render each chunk on a worker
//! thread and return once all workers have finished. Output is
//! byte-identical regardless of the worker count.

pub mod contours;
pub mod executor;
pub mod image;
pub mod lowpass;
pub mod normal_map;

pub use contours::{illuminated_contours, IlluminatedContoursParams};
pub use executor::ProcessingMode;
pub use image::PixelBuffer;
pub use normal_map::{normal_map, Channel, NormalMapParams};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::contours::{illuminated_contours, IlluminatedContoursParams};
    pub use crate::executor::ProcessingMode;
    pub use crate::image::PixelBuffer;
    pub use crate::normal_map::{normal_map, Channel, NormalMapParams};
    pub use reliefshade_core::prelude::*;
}
