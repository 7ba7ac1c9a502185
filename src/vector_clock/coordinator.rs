// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A per-node mutable holder around an immutable [`VectorClock`], applying
//! the local-event, send, and receive transitions and tracking their
//! statistics.

use std::sync::Mutex;

use super::VectorClock;
use crate::error::Result;
use crate::stats::Counter;

/// Atomic counters for a [`VectorClockCoordinator`].
#[derive(Debug, Default)]
pub struct VectorClockCoordinatorStats {
    pub send_count: Counter,
    pub receive_count: Counter,
    pub local_event_count: Counter,
    pub clock_merges: Counter,
}

/// Wraps a [`VectorClock`] under a lock, advancing it for local events and
/// incoming/outgoing messages.
pub struct VectorClockCoordinator {
    node_id: u16,
    state: Mutex<VectorClock>,
    stats: VectorClockCoordinatorStats,
}

impl VectorClockCoordinator {
    pub fn new(node_id: u16) -> Self {
        VectorClockCoordinator { node_id, state: Mutex::new(VectorClock::new()), stats: VectorClockCoordinatorStats::default() }
    }

    pub fn stats(&self) -> &VectorClockCoordinatorStats {
        &self.stats
    }

    pub fn snapshot(&self) -> VectorClock {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `current := current.increment(node_id)`; returns the new snapshot
    /// to attach to an outgoing message.
    pub fn before_send(&self) -> Result<VectorClock> {
        self.stats.send_count.incr();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = state.increment(self.node_id)?;
        Ok(state.clone())
    }

    /// `current := current.merge(remote).increment(node_id)`.
    pub fn before_receive(&self, remote: &VectorClock) -> Result<VectorClock> {
        self.stats.receive_count.incr();
        self.stats.clock_merges.incr();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = state.merge(remote).increment(self.node_id)?;
        Ok(state.clone())
    }

    /// `current := current.increment(node_id)`, for events with no
    /// associated message.
    pub fn new_local_event(&self) -> Result<VectorClock> {
        self.stats.local_event_count.incr();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = state.increment(self.node_id)?;
        Ok(state.clone())
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
