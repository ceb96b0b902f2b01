//! Chunked parallel execution over image rows
//!
//! Both renderers compute every pixel as a pure function of read-only
//! inputs, so the image can be partitioned into contiguous row chunks and
//! each chunk handed to an independent worker. Chunk boundaries depend only
//! on the row count and the worker count, making output byte-identical
//! regardless of scheduling.

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::image::PixelBuffer;

/// Processing mode for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl Default for ProcessingMode {
    fn default() -> Self {
        ProcessingMode::Parallel
    }
}

impl ProcessingMode {
    fn worker_count(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => rayon::current_num_threads().max(1),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }
}

/// Partition `[0, rows)` into near-equal contiguous ranges.
///
/// The first `rows % chunks` ranges take one extra row. Deterministic
/// given `rows` and `chunks`; never produces more ranges than rows.
pub fn chunk_bounds(rows: usize, chunks: usize) -> Vec<Range<usize>> {
    let chunks = chunks.clamp(1, rows.max(1));
    let base = rows / chunks;
    let rem = rows % chunks;

    let mut bounds = Vec::with_capacity(chunks);
    let mut start = 0;
    for i in 0..chunks {
        let len = base + usize::from(i < rem);
        bounds.push(start..start + len);
        start += len;
    }
    bounds
}

/// Run `op` over row chunks of `image`, one chunk per worker, and block
/// until all workers complete.
///
/// `src_rows` is the number of source grid rows; the image height must be
/// an integer multiple of it (the upsampling factor). Each invocation of
/// `op` receives a range of source rows and the mutable pixel slice for
/// the corresponding image rows, so workers never share mutable state and
/// no locking is needed. A panic inside a worker propagates to the caller
/// after the remaining workers have joined.
pub fn for_each_row_chunk<F>(image: &mut PixelBuffer, src_rows: usize, mode: ProcessingMode, op: F)
where
    F: Fn(Range<usize>, &mut [u32]) + Sync,
{
    debug_assert!(src_rows > 0 && image.height() % src_rows == 0);
    let row_stride = image.width() * (image.height() / src_rows);

    let mut work = Vec::new();
    let mut rest = image.pixels_mut();
    for range in chunk_bounds(src_rows, mode.worker_count()) {
        let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * row_stride);
        rest = tail;
        work.push((range, chunk));
    }

    match mode {
        ProcessingMode::Sequential => {
            for (range, chunk) in work {
                op(range, chunk);
            }
        }
        ProcessingMode::Parallel => {
            work.into_par_iter().for_each(|(range, chunk)| op(range, chunk));
        }
        ProcessingMode::ParallelWith(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .build()
                .expect("Failed to build thread pool");
            pool.install(|| {
                work.into_par_iter().for_each(|(range, chunk)| op(range, chunk));
            });
        }
    }
}
