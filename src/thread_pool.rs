//! Worker pool for fold dispatch.
//!
//! Folds are mapped over a dedicated rayon pool sized to the requested
//! parallelism. Results come back in input order and the first error
//! short-circuits the whole map.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::RsaError;

/// Stack size of each worker thread.
#[cfg(feature = "parallel")]
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Build a pool with `workers` threads and run `op` inside it.
#[cfg(feature = "parallel")]
fn install<OP, R>(workers: usize, op: OP) -> Result<R>
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .stack_size(WORKER_STACK_SIZE)
        .thread_name(|i| format!("rsa-fold-{}", i))
        .build()
        .map_err(|err| RsaError::Configuration {
            reason: format!("failed to build worker pool: {}", err),
        })?;
    Ok(pool.install(op))
}

/// Apply `f` to every item on up to `workers` threads.
///
/// Output order matches input order regardless of scheduling. With one
/// worker (or without the `parallel` feature) items are processed
/// sequentially on the calling thread.
pub(crate) fn try_map<T, U, F>(workers: usize, items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> Result<U> + Sync,
{
    if workers > 1 && items.len() > 1 {
        return par_try_map(workers.min(items.len()), items, f);
    }
    items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
}

#[cfg(feature = "parallel")]
fn par_try_map<T, U, F>(workers: usize, items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> Result<U> + Sync,
{
    install(workers, || {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| f(i, item))
            .collect::<Result<Vec<U>>>()
    })?
}

#[cfg(not(feature = "parallel"))]
fn par_try_map<T, U, F>(_workers: usize, items: &[T], f: F) -> Result<Vec<U>>
where
    F: Fn(usize, &T) -> Result<U>,
{
    // No parallel feature - run on the calling thread
    items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
}
