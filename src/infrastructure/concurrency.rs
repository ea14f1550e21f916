//! Concurrency management for the dependency builder.
//! Sizes the global rayon pool used by pairwise inference.

use anyhow::Result;
use tracing::info;

/// Worker count when none is requested: half the cores, minimum 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool with a controlled worker count.
pub fn init_thread_pool(workers: Option<usize>) -> Result<usize> {
    let cores = num_cpus::get();
    let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!(
        "Initialized thread pool: {} workers (system has {} cores)",
        workers, cores
    );

    Ok(workers)
}
