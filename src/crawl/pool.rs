//! Bounded worker pool for crawl tasks.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Live task counters, shared with progress reporting.
#[derive(Debug, Default)]
pub struct PoolCounters {
    submitted: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
}

/// Point-in-time copy of [`PoolCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub submitted: usize,
    pub active: usize,
    pub completed: usize,
    pub panicked: usize,
}

impl PoolCounters {
    #[must_use]
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            panicked: 0,
        }
    }
}

/// Marks a task active for as long as it lives, including across a panic.
struct ActiveGuard(Arc<PoolCounters>);

impl ActiveGuard {
    fn enter(counters: Arc<PoolCounters>) -> Self {
        counters.active.fetch_add(1, Ordering::Relaxed);
        Self(counters)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
        self.0.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fixed-size pool running at most `size` tasks at once.
///
/// [`WorkerPool::submit`] waits for a free slot before spawning, so a
/// submission loop is throttled to the pool size. [`WorkerPool::drain`] waits
/// for every submitted task and hands back their outputs. Dropping a pool
/// that has not been drained aborts its outstanding tasks.
pub struct WorkerPool<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
    counters: Arc<PoolCounters>,
}

impl<T> WorkerPool<T>
where
    T: Send + 'static,
{
    /// Create a pool with `size` worker slots (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(size.max(1))),
            tasks: JoinSet::new(),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Shared counters for progress reporting.
    #[must_use]
    pub fn counters(&self) -> Arc<PoolCounters> {
        Arc::clone(&self.counters)
    }

    /// Run `task` once a worker slot is free.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool's semaphore has been closed.
    pub async fn submit<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .context("Worker pool closed")?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let counters = Arc::clone(&self.counters);
        self.tasks.spawn(async move {
            let _permit = permit;
            let _active = ActiveGuard::enter(counters);
            task.await
        });
        Ok(())
    }

    /// Wait for every submitted task and return their outputs in completion order.
    pub async fn drain(mut self) -> (Vec<T>, PoolStats) {
        let mut outputs = Vec::with_capacity(self.tasks.len());
        let mut panicked = 0;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    error!("Worker task panicked: {e}");
                    panicked += 1;
                }
            }
        }

        let stats = PoolStats {
            panicked,
            ..self.counters.snapshot()
        };
        (outputs, stats)
    }
}
