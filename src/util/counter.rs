use super::cache_padded::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic, increment-only 64-bit counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: CachePadded<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Increment by one and return the new value.
    pub fn advance(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
