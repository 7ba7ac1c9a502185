// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! An instrumented [`HlcFactory`] wrapper, plus a process-wide-style
//! registry of one coordinator per node id sharing a time source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{HlcConfig, HlcFactory, HlcTimestamp};
use crate::error::Result;
use crate::stats::{Counter, MaxTracker};
use crate::time::TimeSource;
use crate::uuid7::{RandomSource, UuidV7};

/// Atomic counters tracked per [`HlcCoordinator`] instance.
#[derive(Debug, Default)]
pub struct HlcCoordinatorStats {
    pub local_event_count: Counter,
    pub send_count: Counter,
    pub receive_count: Counter,
    pub clock_advances: Counter,
    pub max_remote_ahead_ms: MaxTracker,
    pub max_remote_behind_ms: MaxTracker,
    pub remote_ahead_count: Counter,
    pub max_observed_drift_ms: MaxTracker,
}

/// Wraps an [`HlcFactory`] with the statistics [`HlcCoordinatorStats`]
/// describes.
pub struct HlcCoordinator<T: TimeSource, R: RandomSource> {
    factory: HlcFactory<T, R>,
    stats: Arc<HlcCoordinatorStats>,
}

impl<T: TimeSource, R: RandomSource> HlcCoordinator<T, R> {
    pub fn new(factory: HlcFactory<T, R>) -> Self {
        HlcCoordinator { factory, stats: Arc::new(HlcCoordinatorStats::default()) }
    }

    pub fn stats(&self) -> &HlcCoordinatorStats {
        &self.stats
    }

    pub fn config(&self) -> &HlcConfig {
        self.factory.config()
    }

    pub fn local_event(&self) -> Result<HlcTimestamp> {
        self.stats.local_event_count.incr();
        self.factory.send()
    }

    pub fn send(&self) -> Result<HlcTimestamp> {
        self.stats.send_count.incr();
        self.factory.send()
    }

    pub fn send_uuid(&self) -> Result<UuidV7> {
        self.stats.send_count.incr();
        self.factory.send_uuid()
    }

    pub fn receive(&self, remote: HlcTimestamp) -> Result<HlcTimestamp> {
        self.stats.receive_count.incr();
        let (before, after) = self.factory.receive_with_before(remote)?;
        self.record_receive_stats(before, remote, after);
        Ok(after)
    }

    pub fn witness(&self, remote_ms: i64) -> Result<HlcTimestamp> {
        self.stats.receive_count.incr();
        let (before, after) = self.factory.witness_with_before(remote_ms)?;
        let remote = HlcTimestamp { wall_time_ms: remote_ms, counter: 0, node_id: 0 };
        self.record_receive_stats(before, remote, after);
        Ok(after)
    }

    fn record_receive_stats(&self, before: HlcTimestamp, remote: HlcTimestamp, after: HlcTimestamp) {
        let delta = remote.wall_time_ms - before.wall_time_ms;
        if delta > 0 {
            self.stats.remote_ahead_count.incr();
            self.stats.max_remote_ahead_ms.observe(delta);
        } else {
            self.stats.max_remote_behind_ms.observe(-delta);
        }
        self.stats.max_observed_drift_ms.observe(delta.abs());

        if remote.wall_time_ms > before.wall_time_ms && after.wall_time_ms == remote.wall_time_ms {
            self.stats.clock_advances.incr();
        }
    }

    pub fn checkpoint(&self) -> [u8; 12] {
        self.factory.checkpoint()
    }

    pub fn restore(&self, checkpoint: &[u8; 12]) {
        self.factory.restore(checkpoint)
    }
}

/// A shared mapping from node id to its [`HlcCoordinator`], all built over
/// the same time source and random source. `register` is idempotent;
/// `simulate_message` drives a send/receive pair serialized against other
/// calls on this registry.
pub struct HlcClusterRegistry<T: TimeSource, R: RandomSource> {
    time_source: Arc<T>,
    random_source: Arc<R>,
    max_drift_ms: i64,
    throw_on_excessive_drift: bool,
    coordinators: Mutex<HashMap<u16, Arc<HlcCoordinator<T, R>>>>,
    simulation_lock: Mutex<()>,
}

impl<T: TimeSource, R: RandomSource> HlcClusterRegistry<T, R> {
    pub fn new(
        time_source: Arc<T>,
        random_source: Arc<R>,
        max_drift_ms: i64,
        throw_on_excessive_drift: bool,
    ) -> Self {
        HlcClusterRegistry {
            time_source,
            random_source,
            max_drift_ms,
            throw_on_excessive_drift,
            coordinators: Mutex::new(HashMap::new()),
            simulation_lock: Mutex::new(()),
        }
    }

    /// Returns the coordinator for `node_id`, creating it on first use.
    pub fn register(&self, node_id: u16) -> Arc<HlcCoordinator<T, R>> {
        let mut coordinators = self.coordinators.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(coordinators.entry(node_id).or_insert_with(|| {
            let config = HlcConfig {
                node_id,
                max_drift_ms: self.max_drift_ms,
                throw_on_excessive_drift: self.throw_on_excessive_drift,
            };
            let factory = HlcFactory::new(Arc::clone(&self.time_source), Arc::clone(&self.random_source), config);
            Arc::new(HlcCoordinator::new(factory))
        }))
    }

    /// Sends on `sender` and witnesses the result on `receiver`, serialized
    /// against other `simulate_message` calls on this registry so external
    /// observers never see the two halves interleaved with another pair.
    pub fn simulate_message(&self, sender: u16, receiver: u16) -> Result<(HlcTimestamp, HlcTimestamp)> {
        let _guard = self.simulation_lock.lock().unwrap_or_else(|e| e.into_inner());
        let sender_coordinator = self.register(sender);
        let receiver_coordinator = self.register(receiver);
        let sent = sender_coordinator.send()?;
        let received = receiver_coordinator.receive(sent)?;
        Ok((sent, received))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
