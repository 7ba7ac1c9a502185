// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Small atomic building blocks shared by every component's statistics.
//!
//! Every statistics object in this crate (time source, UUIDv7 factory, HLC
//! coordinator, vector clock coordinator) is built out of [`Counter`] and
//! [`MaxTracker`]: plain monotonic counters and an "interlocked max" that
//! never moves backward. Readers never take a lock; values are read with
//! `Ordering::Relaxed` loads, which is sufficient because nothing downstream
//! depends on the relative order of two different counters' updates, only on
//! each counter's own monotonic progression.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A monotonic, wrap-on-overflow-free counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Counter(AtomicU64::new(0))
    }

    #[inline]
    pub fn incr(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn add(&self, n: u64) -> u64 {
        self.0.fetch_add(n, Ordering::Relaxed) + n
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Tracks the maximum `i64` value observed via [`MaxTracker::observe`].
///
/// Implemented as a CAS retry loop rather than a mutex: readers always see a
/// monotonically non-decreasing value with no blocking.
#[derive(Debug)]
pub struct MaxTracker(AtomicI64);

impl Default for MaxTracker {
    fn default() -> Self {
        Self::new(i64::MIN)
    }
}

impl MaxTracker {
    pub const fn new(initial: i64) -> Self {
        MaxTracker(AtomicI64::new(initial))
    }

    /// Updates the tracked maximum if `value` is greater than the current
    /// one. Returns the value now stored (which may be `value` or a larger
    /// value raced in concurrently).
    pub fn observe(&self, value: i64) -> i64 {
        let mut current = self.0.load(Ordering::Relaxed);
        while value > current {
            match self.0.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return value,
                Err(observed) => current = observed,
            }
        }
        current
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset(&self, initial: i64) {
        self.0.store(initial, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
