// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Parallel batched evaluation: partitions a batch of points into contiguous
//! chunks and evaluates them on a pool of worker threads.
//!
//! Chunk *order* is preserved in the concatenated result regardless of worker
//! completion order; callers rely on this to keep pixel and voxel layouts
//! stable.

use std::str::FromStr as _;
use std::thread;

use crate::math::Position;

/// Errors arising from worker-pool configuration.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Worker count was zero.
    #[error("Must have at least 1 worker.")]
    InvalidWorkers,
    /// Unrecognized concurrency method name.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),
}

/// Concurrency method for the worker pool.
///
/// A process-per-chunk `fork` would need every field closure to be
/// serializable across a process boundary, which arbitrary `dyn Fn` fields
/// are not; `Fork` therefore executes as `Thread`, and the two are
/// guaranteed to produce identical results.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExecMethod {
    /// One OS thread per chunk.
    Thread,
    /// Accepted for compatibility; executes as [`ExecMethod::Thread`].
    Fork,
}

impl ExecMethod {
    /// Parses a method name (`"thread"` or `"fork"`).
    pub fn parse(name: &str) -> Result<Self, EvalError> {
        Self::from_str(name).map_err(|_| EvalError::InvalidMethod(name.to_owned()))
    }
}

impl Default for ExecMethod {
    fn default() -> Self {
        ExecMethod::Thread
    }
}

/// Resolves an optional worker count: `None` means one worker per CPU.
pub(crate) fn resolve_workers(workers: Option<usize>) -> Result<usize, EvalError> {
    match workers {
        None => Ok(num_cpus::get()),
        Some(0) => Err(EvalError::InvalidWorkers),
        Some(count) => Ok(count),
    }
}

/// Chunk length for dividing `len` items among `workers` workers. The final
/// chunk absorbs any remainder.
pub(crate) fn chunk_size(len: usize, workers: usize) -> usize {
    (len / workers).max(1)
}

/// Evaluates `func` over `points` in parallel.
///
/// The batch is split into contiguous chunks of `max(1, ⌊N/workers⌋)` points;
/// each chunk is evaluated by its own worker and the per-chunk results are
/// concatenated in chunk order, so the output is exactly `func(points)`.
///
/// `workers` of `None` uses the CPU count. `method` is a concurrency method
/// name (`"thread"` or `"fork"`); anything else fails with
/// [`EvalError::InvalidMethod`]. A panic in `func` propagates to the caller.
pub fn peval<T, F>(
    func: F,
    points: &[Position],
    workers: Option<usize>,
    method: &str,
) -> Result<Vec<T>, EvalError>
where
    T: Send,
    F: Fn(&[Position]) -> Vec<T> + Sync,
{
    let workers = resolve_workers(workers)?;
    // Both methods execute on threads; see `ExecMethod`.
    let _ = ExecMethod::parse(method)?;
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let chunk = chunk_size(points.len(), workers);
    let func = &func;
    let results = thread::scope(|scope| {
        let handles: Vec<_> = points
            .chunks(chunk)
            .map(|chunk_points| scope.spawn(move || func(chunk_points)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Vec<Vec<T>>>()
    });
    Ok(results.into_iter().flatten().collect())
}
