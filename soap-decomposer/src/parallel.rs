//! Process-wide configuration of the worker pool used by batch operations.
//!
//! Batch operations ([`SoapVectorCollection::rdfs`], the assignment pass of
//! [`DistributionCollection::unique`], ...) run on a rayon thread pool. By
//! default this is rayon's global pool, which can be sized with the
//! `RAYON_NUM_THREADS` environment variable. Calling [`configure_workers`]
//! installs a dedicated pool used by all batch operations started afterwards.
//! Each batch takes a snapshot of the pool when it starts, so reconfiguring
//! the workers does not affect batches already running.
//!
//! [`SoapVectorCollection::rdfs`]: crate::SoapVectorCollection::rdfs
//! [`DistributionCollection::unique`]: crate::DistributionCollection::unique

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use rayon::prelude::*;

use crate::Error;

static WORKERS: Lazy<RwLock<Option<Arc<rayon::ThreadPool>>>> = Lazy::new(|| RwLock::new(None));

/// Use `n_workers` threads for all batch operations started after this call
pub fn configure_workers(n_workers: usize) -> Result<(), Error> {
    if n_workers == 0 {
        return Err(Error::Configuration(
            "the number of workers must be at least 1".into()
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .thread_name(|i| format!("soap-decomposer-{}", i))
        .build()
        .map_err(|e| Error::Configuration(format!("failed to create worker pool: {}", e)))?;

    let mut workers = WORKERS.write().expect("mutex was poisoned");
    if workers.is_some() {
        log::warn!("replacing the existing worker pool with {} workers", n_workers);
    }
    *workers = Some(Arc::new(pool));

    return Ok(());
}

/// Go back to using rayon's global thread pool for batch operations
pub fn reset_workers() {
    *WORKERS.write().expect("mutex was poisoned") = None;
}

/// Number of workers batch operations started now would use
pub fn current_workers() -> usize {
    match &*WORKERS.read().expect("mutex was poisoned") {
        Some(pool) => pool.current_num_threads(),
        None => rayon::current_num_threads(),
    }
}

/// Run `function` inside the worker pool configured at the time of the call.
/// Parallel iterators used by `function` run on the same pool, even if the
/// workers are reconfigured in the meantime; `function` should not call
/// `install` again.
pub(crate) fn install<F, R>(function: F) -> R
    where F: FnOnce() -> R + Send, R: Send
{
    let pool = WORKERS.read().expect("mutex was poisoned").clone();
    match pool {
        Some(pool) => pool.install(function),
        None => function(),
    }
}

/// Apply `function` to all items in parallel, collecting the results in input
/// order. If any call fails, the whole batch fails with the error of the
/// failing item with the lowest position.
pub(crate) fn try_map<T, U, F>(items: &[T], function: F) -> Result<Vec<U>, Error>
    where T: Sync,
          U: Send,
          F: Fn(&T) -> Result<U, Error> + Sync + Send,
{
    let results = install(|| {
        items.par_iter()
            .map(&function)
            .collect::<Vec<_>>()
    });

    let mut output = Vec::with_capacity(results.len());
    for (position, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => output.push(value),
            Err(error) => {
                return Err(Error::Batch {
                    position: position,
                    error: Box::new(error),
                });
            }
        }
    }

    return Ok(output);
}
