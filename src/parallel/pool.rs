//! Rayon thread pool configuration for batches of independent runs.

use rayon::ThreadPoolBuilder;

/// How many worker threads parallel batches use.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// 0 means the global Rayon pool (all cores).
    pub workers: usize,
}

impl WorkerPool {
    pub fn default_workers() -> Self {
        Self::default()
    }

    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Runs `f` on a pool of this size. A dedicated pool that cannot be built falls back to
    /// the global pool.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return f();
        }
        match ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(f),
            Err(err) => {
                log::warn!("could not build a {}-thread pool ({err}), using the global pool", self.workers);
                f()
            }
        }
    }
}
