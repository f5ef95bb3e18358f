//! Worker pool for the shared-memory and hybrid variants.
//!
//! Each shared-memory product runs inside its own [`rayon::ThreadPool`] sized
//! to the requested thread count, so concurrent products (one per rank in
//! hybrid mode) never compete for the global pool.

use tracing::debug;

use crate::error::{invalid_config, Result};

/// A fixed-size work-stealing pool.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Builds a pool of `threads` workers named `stratmul-worker-{i}`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MatmulError::InvalidConfig`] if `threads == 0` and
    /// [`crate::MatmulError::ThreadPool`] if the OS refuses the threads.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(invalid_config("worker pool needs at least one thread"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("stratmul-worker-{i}"))
            .build()?;
        debug!(threads, "built worker pool");
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `op` inside the pool; rayon iterators in `op` use its workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}
