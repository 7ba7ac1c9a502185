// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A fully deterministic time source: wall time and scheduler ticks move
//! only when explicitly told to, making timer firing order reproducible
//! across runs.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::trace;

use super::{validate_due_period, TimeSource, Timer, TimerCallback, INFINITE};
use crate::error::{Error, Result};
use crate::stats::{Counter, MaxTracker};

/// Counters for a [`SimulatedTimeSource`]'s scheduler activity.
#[derive(Debug, Default)]
pub struct SimulatedTimeStats {
    pub timers_created: Counter,
    pub timers_changed: Counter,
    pub timers_disposed: Counter,
    pub timers_fired: Counter,
    pub periodic_reschedules: Counter,
    pub advance_calls: Counter,
    pub advanced_ticks: Counter,
    pub queue_enqueues: Counter,
    pub max_queue_len: MaxTracker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    due_at_ticks: i64,
    id: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at_ticks.cmp(&other.due_at_ticks).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerRecord {
    due_at_ticks: i64,
    period_ticks: i64,
    callback: TimerCallback,
    disposed: bool,
}

struct SimulatedState {
    wall_time_ms: i64,
    scheduler_ticks: i64,
    next_timer_id: u64,
    queue: BinaryHeap<Reverse<QueueEntry>>,
    timers: HashMap<u64, TimerRecord>,
}

/// A time source whose wall time and scheduler ticks move only via
/// [`SimulatedTimeSource::set_utc_now`] / [`SimulatedTimeSource::advance`].
pub struct SimulatedTimeSource {
    inner: Arc<Mutex<SimulatedState>>,
    stats: Arc<SimulatedTimeStats>,
}

impl SimulatedTimeSource {
    /// Creates a provider starting at the given wall time (ms since epoch),
    /// with scheduler ticks starting at zero.
    pub fn new(initial_wall_time_ms: i64) -> Self {
        SimulatedTimeSource {
            inner: Arc::new(Mutex::new(SimulatedState {
                wall_time_ms: initial_wall_time_ms,
                scheduler_ticks: 0,
                next_timer_id: 0,
                queue: BinaryHeap::new(),
                timers: HashMap::new(),
            })),
            stats: Arc::new(SimulatedTimeStats::default()),
        }
    }

    pub fn stats(&self) -> &SimulatedTimeStats {
        &self.stats
    }

    /// Replaces wall time without advancing scheduler ticks or firing
    /// timers. Wall time may move backward.
    pub fn set_utc_now(&self, t_ms: i64) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.wall_time_ms = t_ms;
    }

    /// Advances wall time and scheduler ticks by `d_ms`, draining and firing
    /// all timers whose due tick is now `<=` the new scheduler tick.
    /// Callbacks run after the internal lock is released, on the caller's
    /// thread, and may re-enter this provider.
    pub fn advance(&self, d_ms: i64) -> Result<()> {
        if d_ms < 0 {
            return Err(Error::InvalidArgument(format!(
                "advance duration must be non-negative, got {d_ms}"
            )));
        }

        self.stats.advance_calls.incr();
        self.stats.advanced_ticks.add(d_ms as u64);

        let due_callbacks = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            state.wall_time_ms += d_ms;
            state.scheduler_ticks += d_ms;
            self.drain_due(&mut state)
        };

        for cb in due_callbacks {
            cb();
            self.stats.timers_fired.incr();
        }
        Ok(())
    }

    /// Pops and fires every timer due at or before the current scheduler
    /// tick, coalescing periodic timers to at most one fire per call.
    fn drain_due(&self, state: &mut SimulatedState) -> Vec<TimerCallback> {
        let mut fired = Vec::new();
        loop {
            let Some(&Reverse(top)) = state.queue.peek() else { break };
            if top.due_at_ticks > state.scheduler_ticks {
                break;
            }
            state.queue.pop();

            let Some(record) = state.timers.get_mut(&top.id) else { continue };
            if record.disposed {
                continue;
            }
            if record.due_at_ticks != top.due_at_ticks {
                // Stale entry left behind by a `change` call; the live
                // entry for this timer is elsewhere in the queue.
                continue;
            }

            fired.push(Arc::clone(&record.callback));
            trace!(timer_id = top.id, due_at_ticks = top.due_at_ticks, "timer fired");

            // Only a strictly positive, finite period re-enqueues; a period
            // of 0 or INFINITE is one-shot (0 would otherwise recompute a
            // due tick that is still due, firing forever within one drain).
            if record.period_ticks > 0 && record.period_ticks != INFINITE {
                record.due_at_ticks = state.scheduler_ticks + record.period_ticks;
                trace!(timer_id = top.id, next_due_at_ticks = record.due_at_ticks, "timer rescheduled");
                state
                    .queue
                    .push(Reverse(QueueEntry { due_at_ticks: record.due_at_ticks, id: top.id }));
                self.stats.queue_enqueues.incr();
                self.stats.periodic_reschedules.incr();
            } else {
                trace!(timer_id = top.id, "timer disposed after firing");
                record.disposed = true;
                self.stats.timers_disposed.incr();
            }
        }
        self.stats.max_queue_len.observe(state.queue.len() as i64);
        fired
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl TimeSource for SimulatedTimeSource {
    fn now_utc(&self) -> DateTime<Utc> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        ms_to_datetime(state.wall_time_ms)
    }

    fn now_utc_ms(&self) -> i64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).wall_time_ms
    }

    fn monotonic_ticks(&self) -> i64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).scheduler_ticks
    }

    fn create_timer(
        &self,
        due_ms: i64,
        period_ms: i64,
        callback: TimerCallback,
    ) -> Result<Arc<dyn Timer>> {
        validate_due_period(due_ms, period_ms)?;

        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = state.next_timer_id;
        state.next_timer_id += 1;

        let due_at_ticks =
            if due_ms == INFINITE { i64::MAX } else { state.scheduler_ticks + due_ms };

        state.timers.insert(
            id,
            TimerRecord { due_at_ticks, period_ticks: period_ms, callback, disposed: false },
        );
        state.queue.push(Reverse(QueueEntry { due_at_ticks, id }));
        drop(state);

        self.stats.timers_created.incr();
        self.stats.queue_enqueues.incr();

        Ok(Arc::new(SimulatedTimer { inner: Arc::clone(&self.inner), stats: Arc::clone(&self.stats), id }))
    }

    fn local_time_zone(&self) -> String {
        "+00:00".to_string()
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

struct SimulatedTimer {
    inner: Arc<Mutex<SimulatedState>>,
    stats: Arc<SimulatedTimeStats>,
    id: u64,
}

impl Timer for SimulatedTimer {
    fn change(&self, due_ms: i64, period_ms: i64) -> Result<bool> {
        validate_due_period(due_ms, period_ms)?;

        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let scheduler_ticks = state.scheduler_ticks;
        let Some(record) = state.timers.get_mut(&self.id) else { return Ok(false) };
        if record.disposed {
            return Ok(false);
        }

        let due_at_ticks = if due_ms == INFINITE { i64::MAX } else { scheduler_ticks + due_ms };
        record.due_at_ticks = due_at_ticks;
        record.period_ticks = period_ms;
        state.queue.push(Reverse(QueueEntry { due_at_ticks, id: self.id }));
        drop(state);

        self.stats.timers_changed.incr();
        self.stats.queue_enqueues.incr();
        Ok(true)
    }

    fn dispose(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = state.timers.get_mut(&self.id) {
            if !record.disposed {
                record.disposed = true;
                drop(state);
                trace!(timer_id = self.id, "timer disposed explicitly");
                self.stats.timers_disposed.incr();
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "simulated_tests.rs"]
mod tests;
