// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The HLC mechanism itself: `Send`/`Receive`/`Witness`, drift
//! enforcement, and checkpoint/restore. No statistics live here; see
//! [`super::coordinator`] for the instrumented wrapper.

use std::sync::{Arc, Mutex};

use tracing::warn;

use super::HlcTimestamp;
use crate::error::{Error, Result};
use crate::time::TimeSource;
use crate::uuid7::{RandomSource, UuidV7};

/// Static configuration for an [`HlcFactory`].
#[derive(Debug, Clone, Copy)]
pub struct HlcConfig {
    pub node_id: u16,
    pub max_drift_ms: i64,
    pub throw_on_excessive_drift: bool,
}

impl HlcConfig {
    /// A permissive default: generous drift budget, never throws.
    pub fn new(node_id: u16) -> Self {
        HlcConfig { node_id, max_drift_ms: 60_000, throw_on_excessive_drift: false }
    }
}

struct HlcState {
    logical_ms: i64,
    counter: u16,
}

fn roll_overflow(logical_ms: &mut i64, counter: &mut u16) {
    if *counter > 0xFFF {
        *logical_ms += 1;
        *counter = 0;
    }
}

/// Produces [`HlcTimestamp`] values for one node: `Send` for local events,
/// `Receive`/`Witness` for incoming messages.
pub struct HlcFactory<T: TimeSource, R: RandomSource> {
    time_source: Arc<T>,
    random_source: Arc<R>,
    config: HlcConfig,
    state: Mutex<HlcState>,
}

impl<T: TimeSource, R: RandomSource> HlcFactory<T, R> {
    pub fn new(time_source: Arc<T>, random_source: Arc<R>, config: HlcConfig) -> Self {
        HlcFactory { time_source, random_source, config, state: Mutex::new(HlcState { logical_ms: 0, counter: 0 }) }
    }

    pub fn config(&self) -> &HlcConfig {
        &self.config
    }

    fn check_drift(&self, logical_ms: i64, pt: i64) -> Result<()> {
        let drift = logical_ms - pt;
        if drift > self.config.max_drift_ms {
            if self.config.throw_on_excessive_drift {
                return Err(Error::HlcDriftExceeded { actual: drift, max: self.config.max_drift_ms });
            }
            warn!(node_id = self.config.node_id, drift_ms = drift, max_ms = self.config.max_drift_ms, "HLC drift exceeds configured maximum");
        }
        Ok(())
    }

    /// A local event / outgoing message timestamp.
    pub fn send(&self) -> Result<HlcTimestamp> {
        self.send_with_before().map(|(_, after)| after)
    }

    /// As [`HlcFactory::send`], also returning the pre-update timestamp —
    /// used by [`super::coordinator::HlcCoordinator`] to compute statistics
    /// atomically with the update.
    pub(crate) fn send_with_before(&self) -> Result<(HlcTimestamp, HlcTimestamp)> {
        let pt = self.time_source.now_utc_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let before = HlcTimestamp { wall_time_ms: state.logical_ms, counter: state.counter, node_id: self.config.node_id };

        if pt > state.logical_ms {
            state.logical_ms = pt;
            state.counter = 0;
        } else {
            state.counter += 1;
            roll_overflow(&mut state.logical_ms, &mut state.counter);
        }

        self.check_drift(state.logical_ms, pt)?;
        let after = HlcTimestamp { wall_time_ms: state.logical_ms, counter: state.counter, node_id: self.config.node_id };
        Ok((before, after))
    }

    /// As [`HlcFactory::send`], additionally embedding the result into a
    /// UUIDv7 using 6 bytes from the injected random source.
    pub fn send_uuid(&self) -> Result<UuidV7> {
        let after = self.send()?;
        let mut tail = [0u8; 6];
        self.random_source.fill_bytes(&mut tail);
        Ok(after.to_uuidv7(tail))
    }

    /// Witnesses a remote timestamp, producing a new local timestamp
    /// strictly greater than both the previous local one and `remote`.
    pub fn receive(&self, remote: HlcTimestamp) -> Result<HlcTimestamp> {
        self.receive_with_before(remote).map(|(_, after)| after)
    }

    pub(crate) fn receive_with_before(&self, remote: HlcTimestamp) -> Result<(HlcTimestamp, HlcTimestamp)> {
        let pt = self.time_source.now_utc_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let before = HlcTimestamp { wall_time_ms: state.logical_ms, counter: state.counter, node_id: self.config.node_id };
        let physical = HlcTimestamp { wall_time_ms: pt, counter: 0, node_id: 0 };

        let max_val = before.max(remote).max(physical);

        if max_val == before {
            state.counter += 1;
            roll_overflow(&mut state.logical_ms, &mut state.counter);
        } else if max_val == remote {
            state.logical_ms = remote.wall_time_ms;
            state.counter = remote.counter + 1;
            roll_overflow(&mut state.logical_ms, &mut state.counter);
        } else {
            state.logical_ms = pt;
            state.counter = 0;
        }

        self.check_drift(state.logical_ms, pt)?;
        let after = HlcTimestamp { wall_time_ms: state.logical_ms, counter: state.counter, node_id: self.config.node_id };
        Ok((before, after))
    }

    /// Scalar witness: equivalent to [`HlcFactory::receive`] of
    /// `(remote_ms, 0, 0)`.
    pub fn witness(&self, remote_ms: i64) -> Result<HlcTimestamp> {
        self.receive(HlcTimestamp { wall_time_ms: remote_ms, counter: 0, node_id: 0 })
    }

    pub(crate) fn witness_with_before(&self, remote_ms: i64) -> Result<(HlcTimestamp, HlcTimestamp)> {
        self.receive_with_before(HlcTimestamp { wall_time_ms: remote_ms, counter: 0, node_id: 0 })
    }

    /// `(logical_ms: i64, counter: u16, node_id: u16)` as 12 little-endian
    /// bytes.
    pub fn checkpoint(&self) -> [u8; 12] {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut buf = [0u8; 12];
        buf[0..8].copy_from_slice(&state.logical_ms.to_le_bytes());
        buf[8..10].copy_from_slice(&state.counter.to_le_bytes());
        buf[10..12].copy_from_slice(&self.config.node_id.to_le_bytes());
        buf
    }

    /// Adopts `checkpoint` only if its `(logical_ms, counter)` pair is
    /// lexicographically greater than the current one; otherwise a no-op.
    pub fn restore(&self, checkpoint: &[u8; 12]) {
        let logical_ms = i64::from_le_bytes(checkpoint[0..8].try_into().unwrap_or([0u8; 8]));
        let counter = u16::from_le_bytes([checkpoint[8], checkpoint[9]]);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if (logical_ms, counter) > (state.logical_ms, state.counter) {
            state.logical_ms = logical_ms;
            state.counter = counter;
        }
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
