//! Progress reporting and cooperative cancellation

/// Observer for long-running renders.
///
/// Implementations must be safe to poll from worker threads. Cancellation
/// is cooperative and coarse-grained: renderers poll `is_cancelled` at row
/// granularity and may complete already-dispatched work after a cancel
/// request. A partially rendered image is a defined outcome, not an error.
pub trait ProgressListener: Sync {
    /// Report overall progress as an integer percentage in 0..=100.
    fn progress(&self, percent: i32);

    /// Whether the caller has requested cancellation.
    fn is_cancelled(&self) -> bool;
}
