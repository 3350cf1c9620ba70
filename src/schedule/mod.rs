//! Chunked evaluation of a fused image into a dense buffer.
//!
//! The output is cut into contiguous ranges of linear pixel indices. Each
//! range is evaluated by its own clone of the image, so workers share no
//! mutable state and the result does not depend on the thread count.

use crate::fusion::FusedImage;
use crate::raster::OwnedVolume;
use crate::trace::{trace_event, trace_span};
use crate::util::{ViewFuseError, ViewFuseResult};
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Target number of pixels per chunk for large outputs.
pub const PIXELS_PER_CHUNK: usize = 262_144;

/// Scheduling options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ScheduleConfig {
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
}

impl ScheduleConfig {
    /// Creates a config with a fixed thread count.
    pub fn with_threads(threads: usize) -> Self {
        Self { threads }
    }

    /// Resolved thread count (at least 1).
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Splits `total` pixels into contiguous, non-empty ranges.
///
/// The count is `max(threads, total / PIXELS_PER_CHUNK)` clamped to
/// `[1, total]`; range lengths differ by at most one.
pub fn plan_chunks(total: usize, threads: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let count = threads.max(total / PIXELS_PER_CHUNK).clamp(1, total);
    let base = total / count;
    let extra = total % count;
    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Evaluates every pixel of `image` into a new volume.
pub fn materialize(image: &FusedImage<'_>, cfg: &ScheduleConfig) -> ViewFuseResult<OwnedVolume<f32>> {
    let mut data = vec![0.0f32; image.num_pixels()];
    materialize_into(image, &mut data, cfg)?;
    OwnedVolume::new(data, image.dims())
}

/// Evaluates every pixel of `image` into `buffer` (x-fastest order).
///
/// A panic inside a worker is reported as `WorkerFailed` for the first
/// failing chunk; the buffer content is unspecified in that case.
pub fn materialize_into(
    image: &FusedImage<'_>,
    buffer: &mut [f32],
    cfg: &ScheduleConfig,
) -> ViewFuseResult<()> {
    let total = image.num_pixels();
    if buffer.len() != total {
        return Err(ViewFuseError::BufferLengthMismatch {
            expected: total,
            got: buffer.len(),
        });
    }
    let threads = cfg.effective_threads();
    let _span = trace_span!("materialize", pixels = total, threads = threads).entered();

    let chunks = plan_chunks(total, threads);
    trace_event!("chunks_planned", chunks = chunks.len(), threads = threads);

    let mut parts: Vec<(usize, &mut [f32])> = Vec::with_capacity(chunks.len());
    let mut rest = buffer;
    for range in &chunks {
        let (head, tail) = rest.split_at_mut(range.len());
        parts.push((range.start, head));
        rest = tail;
    }

    run_chunks(image, parts, threads)
}

#[cfg(feature = "rayon")]
fn run_chunks(
    image: &FusedImage<'_>,
    parts: Vec<(usize, &mut [f32])>,
    threads: usize,
) -> ViewFuseResult<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| ViewFuseError::ThreadPool {
            reason: err.to_string(),
        })?;
    let results: Vec<ViewFuseResult<()>> = pool.install(|| {
        parts
            .into_par_iter()
            .enumerate()
            .map(|(chunk, (start, out))| run_chunk(image, chunk, start, out))
            .collect()
    });
    results.into_iter().collect()
}

#[cfg(not(feature = "rayon"))]
fn run_chunks(
    image: &FusedImage<'_>,
    parts: Vec<(usize, &mut [f32])>,
    _threads: usize,
) -> ViewFuseResult<()> {
    for (chunk, (start, out)) in parts.into_iter().enumerate() {
        run_chunk(image, chunk, start, out)?;
    }
    Ok(())
}

fn run_chunk(image: &FusedImage<'_>, chunk: usize, start: usize, out: &mut [f32]) -> ViewFuseResult<()> {
    let local = image.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| local.evaluate_into(start, out))) {
        Ok(result) => result,
        Err(payload) => Err(ViewFuseError::WorkerFailed {
            chunk,
            reason: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}
