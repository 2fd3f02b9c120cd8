//! Fork-join dispatch over contiguous index ranges.
//!
//! The [`Dispatcher`] owns a fixed rayon pool. Each call splits `0..len` into
//! one contiguous range per worker (the last range absorbs the remainder),
//! runs the ranges concurrently and returns only after every range finished.

use std::ops::Range;

use crate::error::{Result, SandboxError};

pub struct Dispatcher {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SandboxError::ZeroWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sandbox-worker-{i}"))
            .build()?;
        log::info!("Dispatcher started with {} workers", workers);
        Ok(Self { pool, workers })
    }

    /// Pool sized to the machine's logical core count.
    pub fn with_hardware_concurrency() -> Result<Self> {
        Self::new(num_cpus::get().max(1))
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Splits `0..len` into `workers` contiguous ranges. Leading ranges are
    /// `len / workers` long and the last one takes what is left, so some may
    /// be empty when `len < workers`.
    pub fn split(len: usize, workers: usize) -> Vec<Range<usize>> {
        let workers = workers.max(1);
        let chunk = len / workers;
        (0..workers)
            .map(|w| {
                let begin = w * chunk;
                let end = if w + 1 == workers { len } else { begin + chunk };
                begin..end
            })
            .collect()
    }

    /// Calls `f(begin, end)` once for every non-empty sub-range of `0..len`.
    /// Blocks until all calls return.
    pub fn parallel_for_each<F>(&self, len: usize, f: F)
    where
        F: Fn(usize, usize) + Sync,
    {
        let f = &f;
        self.pool.scope(|scope| {
            for range in Self::split(len, self.workers) {
                if range.is_empty() {
                    continue;
                }
                scope.spawn(move |_| f(range.start, range.end));
            }
        });
    }

    /// Same split as [`parallel_for_each`](Self::parallel_for_each), but hands
    /// each call exclusive access to its slice of `data` together with the
    /// slice's offset.
    pub fn parallel_for_each_mut<T, F>(&self, data: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let f = &f;
        let ranges = Self::split(data.len(), self.workers);
        self.pool.scope(|scope| {
            let mut rest = data;
            for range in ranges {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                if chunk.is_empty() {
                    continue;
                }
                scope.spawn(move |_| f(range.start, chunk));
            }
        });
    }
}
