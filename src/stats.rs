use std::sync::atomic::{AtomicU64, Ordering};

/// Diagnostic counters shared by all collision workers. Approximate by nature;
/// workers tally locally and add once per batch.
#[derive(Debug, Default)]
pub struct CollisionStats {
    comparisons: AtomicU64,
    resolutions: AtomicU64,
}

/// Plain copy of the counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollisionTally {
    pub comparisons: u64,
    pub resolutions: u64,
}

impl CollisionTally {
    pub fn merge(&mut self, other: CollisionTally) {
        self.comparisons += other.comparisons;
        self.resolutions += other.resolutions;
    }
}

impl CollisionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tally: CollisionTally) {
        self.comparisons.fetch_add(tally.comparisons, Ordering::Relaxed);
        self.resolutions.fetch_add(tally.resolutions, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CollisionTally {
        CollisionTally {
            comparisons: self.comparisons.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.comparisons.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
    }
}
