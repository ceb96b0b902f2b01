//! # reliefshade core
//!
//! Shared types for the reliefshade renderers.
//!
//! This crate provides:
//! - [`Grid`]: georeferenced 2-D elevation grid with point and bilinear
//!   sampling, slope and aspect estimation
//! - [`ProgressListener`]: progress reporting and cooperative cancellation
//! - [`Error`] / [`Result`]: common error handling

pub mod error;
pub mod grid;
pub mod progress;

pub use error::{Error, Result};
pub use grid::Grid;
pub use progress::ProgressListener;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::Grid;
    pub use crate::progress::ProgressListener;
}
