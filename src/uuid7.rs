// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! UUIDv7 (RFC 9562) generation: a lock-free, monotonic-per-factory
//! identifier built from wall time and a 12-bit counter packed into one
//! 64-bit atomic word.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::time::TimeSource;

const VERSION_NIBBLE: u8 = 0x7;
const VARIANT_BITS: u8 = 0b10;
const COUNTER_MASK: u64 = 0xFFF;
const RANDOM_REFILL_BYTES: usize = 256;

/// A 128-bit UUIDv7 value. Byte order is the wire's big-endian order, so
/// `Ord`/`Eq` on this type match RFC 4122 string-form and packed-state
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UuidV7(pub [u8; 16]);

impl UuidV7 {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// The wall-time milliseconds embedded in bytes 0–5.
    pub fn timestamp_ms(&self) -> i64 {
        let mut buf = [0u8; 8];
        buf[2..8].copy_from_slice(&self.0[0..6]);
        i64::from_be_bytes(buf)
    }
}

impl fmt::Display for UuidV7 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

/// An injectable source of random bytes for the tail of the UUID. Not
/// required to be cryptographically secure.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]);
}

/// The default [`RandomSource`], backed by [`rand::thread_rng`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// What to do when the 12-bit counter is exhausted within the same
/// millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Spin until wall time advances past the current millisecond.
    SpinWait,
    /// Advance the packed timestamp by one ms ahead of wall time.
    IncrementTimestamp,
    /// Fail the call with [`Error::CounterOverflow`].
    Throw,
    /// [`OverflowPolicy::IncrementTimestamp`] against a simulated time
    /// source (spinning would never resolve on its own), otherwise
    /// [`OverflowPolicy::SpinWait`].
    #[default]
    Auto,
}

thread_local! {
    static RANDOM_BUFFERS: RefCell<Vec<(usize, Vec<u8>, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Pulls `n` random bytes from this thread's buffer for the factory
/// identified by `factory_key`, refilling from `source` in
/// [`RANDOM_REFILL_BYTES`]-byte chunks when exhausted.
fn next_random_bytes(factory_key: usize, source: &dyn RandomSource, out: &mut [u8]) {
    RANDOM_BUFFERS.with(|cell| {
        let mut buffers = cell.borrow_mut();
        let idx = match buffers.iter().position(|(key, _, _)| *key == factory_key) {
            Some(idx) => idx,
            None => {
                buffers.push((factory_key, Vec::new(), 0));
                buffers.len() - 1
            }
        };

        let (_, buf, pos) = &mut buffers[idx];
        if *pos + out.len() > buf.len() {
            buf.resize(RANDOM_REFILL_BYTES.max(out.len()), 0);
            source.fill_bytes(buf);
            *pos = 0;
        }
        out.copy_from_slice(&buf[*pos..*pos + out.len()]);
        *pos += out.len();
    });
}

/// Drops this thread's random-byte buffer for `factory_key`. Called from
/// [`UuidV7Factory::drop`] via the factory's `Arc` pointer identity, so
/// per-thread buffers for a dropped factory aren't retained forever.
fn forget_random_buffer(factory_key: usize) {
    RANDOM_BUFFERS.with(|cell| {
        cell.borrow_mut().retain(|(key, _, _)| *key != factory_key);
    });
}

struct FactoryInner {
    packed_state: AtomicU64,
    overflow_policy: OverflowPolicy,
}

/// Generates monotonically increasing UUIDv7 values. Cheap to clone (an
/// `Arc` internally); share one instance across threads rather than
/// constructing many.
pub struct UuidV7Factory<T: TimeSource, R: RandomSource> {
    inner: Arc<FactoryInner>,
    time_source: Arc<T>,
    random_source: Arc<R>,
}

impl<T: TimeSource, R: RandomSource> Clone for UuidV7Factory<T, R> {
    fn clone(&self) -> Self {
        UuidV7Factory {
            inner: Arc::clone(&self.inner),
            time_source: Arc::clone(&self.time_source),
            random_source: Arc::clone(&self.random_source),
        }
    }
}

impl<T: TimeSource, R: RandomSource> UuidV7Factory<T, R> {
    pub fn new(time_source: Arc<T>, random_source: Arc<R>, overflow_policy: OverflowPolicy) -> Self {
        UuidV7Factory {
            inner: Arc::new(FactoryInner { packed_state: AtomicU64::new(0), overflow_policy }),
            time_source,
            random_source,
        }
    }

    fn factory_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn random_start_counter(&self) -> u16 {
        let mut buf = [0u8; 2];
        next_random_bytes(self.factory_key(), self.random_source.as_ref(), &mut buf);
        // Bias into the lower half, leaving headroom for monotone
        // increments within the millisecond.
        (u16::from_be_bytes(buf) & 0x7FF) as u16
    }

    fn resolves_as_simulated(&self) -> bool {
        self.time_source.is_simulated()
    }

    fn effective_policy(&self) -> OverflowPolicy {
        match self.inner.overflow_policy {
            OverflowPolicy::Auto if self.resolves_as_simulated() => OverflowPolicy::IncrementTimestamp,
            OverflowPolicy::Auto => OverflowPolicy::SpinWait,
            other => other,
        }
    }

    /// Generates a single UUIDv7, retrying the CAS loop under contention
    /// and applying the configured overflow policy when the counter is
    /// exhausted within a millisecond.
    pub fn new_uuid(&self) -> Result<UuidV7> {
        let mut backoff = 0u32;
        loop {
            let cur = self.inner.packed_state.load(Ordering::Acquire);
            let cur_ts = (cur >> 16) as i64 & 0x0000_FFFF_FFFF_FFFF;
            let cur_counter = (cur & COUNTER_MASK) as u16;

            let pt = self.time_source.now_utc_ms();

            let new_state = if pt > cur_ts {
                (pt, self.random_start_counter())
            } else if pt == cur_ts {
                if cur_counter < 0xFFF {
                    (cur_ts, cur_counter + 1)
                } else {
                    match self.handle_overflow(cur_ts)? {
                        Some(state) => state,
                        None => continue, // SpinWait: re-read and retry
                    }
                }
            } else {
                // Clock moved backwards: preserve monotonicity exactly as
                // the equal-timestamp case.
                if cur_counter < 0xFFF {
                    (cur_ts, cur_counter + 1)
                } else {
                    match self.handle_overflow(cur_ts)? {
                        Some(state) => state,
                        None => continue,
                    }
                }
            };

            let packed = pack_state(new_state.0, new_state.1);
            if self
                .inner
                .packed_state
                .compare_exchange_weak(cur, packed, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(self.build_uuid(new_state.0, new_state.1));
            }

            backoff = spin_backoff(backoff);
        }
    }

    /// Returns `Some(new_state)` for policies that resolve immediately, or
    /// `None` for `SpinWait`, meaning "spin then retry the outer loop".
    fn handle_overflow(&self, cur_ts: i64) -> Result<Option<(i64, u16)>> {
        let policy = self.effective_policy();
        debug!(?policy, wall_time_ms = cur_ts, "uuidv7 counter overflow within the millisecond");
        match policy {
            OverflowPolicy::SpinWait => {
                while self.time_source.now_utc_ms() <= cur_ts {
                    std::hint::spin_loop();
                }
                Ok(None)
            }
            OverflowPolicy::IncrementTimestamp => Ok(Some((cur_ts + 1, self.random_start_counter()))),
            OverflowPolicy::Throw => Err(Error::CounterOverflow { wall_time_ms: cur_ts }),
            OverflowPolicy::Auto => unreachable!("effective_policy never returns Auto"),
        }
    }

    fn build_uuid(&self, wall_time_ms: i64, counter: u16) -> UuidV7 {
        let mut bytes = [0u8; 16];
        let ts_bytes = (wall_time_ms as u64).to_be_bytes();
        bytes[0..6].copy_from_slice(&ts_bytes[2..8]);

        bytes[6] = (VERSION_NIBBLE << 4) | ((counter >> 8) as u8 & 0x0F);
        bytes[7] = (counter & 0xFF) as u8;

        let mut tail = [0u8; 8];
        next_random_bytes(self.factory_key(), self.random_source.as_ref(), &mut tail);
        bytes[8] = (VARIANT_BITS << 6) | (tail[0] & 0x3F);
        bytes[9..16].copy_from_slice(&tail[1..8]);

        UuidV7(bytes)
    }

    /// Generates `buffer.len()` UUIDs, defined as repeated single
    /// generation.
    pub fn new_many(&self, buffer: &mut [UuidV7]) -> Result<()> {
        for slot in buffer.iter_mut() {
            *slot = self.new_uuid()?;
        }
        Ok(())
    }
}

impl<T: TimeSource, R: RandomSource> Drop for UuidV7Factory<T, R> {
    fn drop(&mut self) {
        // Only the last owner (refcount about to hit zero) should reclaim
        // per-thread buffers; clones share the same key.
        if Arc::strong_count(&self.inner) == 1 {
            forget_random_buffer(self.factory_key());
        }
    }
}

fn pack_state(wall_time_ms: i64, counter: u16) -> u64 {
    ((wall_time_ms as u64) << 16) | (counter as u64 & COUNTER_MASK)
}

fn spin_backoff(prev: u32) -> u32 {
    if prev < 8 {
        std::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
    prev.wrapping_add(1)
}

#[cfg(test)]
#[path = "uuid7_tests.rs"]
mod tests;
