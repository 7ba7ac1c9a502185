// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A one-shot delayed callback built on top of [`TimeSource`], with
//! cooperative cancellation shared between the caller and the fire path so
//! a race between cancelling and firing is only ever counted once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{TimeSource, Timer, TimerCallback, INFINITE};
use crate::error::Result;
use crate::stats::Counter;

/// Counters for timeouts created via [`create_timeout`] / [`create_timeout_handle`].
#[derive(Debug, Default)]
pub struct TimeoutStats {
    pub fires: Counter,
    pub cancellations: Counter,
}

/// A cloneable, read-only view on whether a timeout has already fired or
/// been cancelled. Hand this to code that needs to check for cancellation
/// but shouldn't be able to trigger it.
#[derive(Clone)]
pub struct Cancellation {
    settled: Arc<AtomicBool>,
}

impl Cancellation {
    /// `true` once the timeout has either fired or been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// A [`Timer`] for an already-settled [`TimeoutHandle`] that never armed a
/// real timer (`delay_ms <= 0`); every operation on it is a no-op.
struct NullTimer;

impl Timer for NullTimer {
    fn change(&self, _due_ms: i64, _period_ms: i64) -> Result<bool> {
        Ok(false)
    }

    fn dispose(&self) {}
}

/// A handle to a scheduled one-shot callback. Dropping the handle does not
/// cancel the timeout; call [`TimeoutHandle::cancel`] explicitly.
pub struct TimeoutHandle {
    timer: Arc<dyn Timer>,
    token: Cancellation,
    stats: Arc<TimeoutStats>,
}

impl TimeoutHandle {
    /// Cancels the timeout if it hasn't already fired. Idempotent; only the
    /// first caller (whether this or the fire path) counts as the
    /// settling event.
    pub fn cancel(&self) {
        if !self.token.settled.swap(true, Ordering::AcqRel) {
            self.timer.dispose();
            self.stats.cancellations.incr();
        }
    }

    /// A cloneable token other code can use to check cancellation without
    /// being able to trigger it.
    pub fn cancellation(&self) -> Cancellation {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn stats(&self) -> &TimeoutStats {
        &self.stats
    }
}

/// Schedules `callback` to run once after `delay_ms`, via `time_source`.
pub fn create_timeout(
    time_source: &dyn TimeSource,
    delay_ms: i64,
    callback: impl Fn() + Send + Sync + 'static,
) -> Result<TimeoutHandle> {
    create_timeout_handle(time_source, delay_ms, Arc::new(callback))
}

/// As [`create_timeout`], taking an already-boxed callback. Useful when the
/// caller already has a [`TimerCallback`] on hand (e.g. forwarding one).
///
/// A non-positive `delay_ms` is returned already cancelled, with no real
/// timer ever armed: the statistics record it as fired and disposed.
pub fn create_timeout_handle(
    time_source: &dyn TimeSource,
    delay_ms: i64,
    callback: TimerCallback,
) -> Result<TimeoutHandle> {
    let stats = Arc::new(TimeoutStats::default());

    if delay_ms <= 0 {
        stats.fires.incr();
        stats.cancellations.incr();
        return Ok(TimeoutHandle {
            timer: Arc::new(NullTimer),
            token: Cancellation { settled: Arc::new(AtomicBool::new(true)) },
            stats,
        });
    }

    let settled = Arc::new(AtomicBool::new(false));

    let settled_for_fire = Arc::clone(&settled);
    let stats_for_fire = Arc::clone(&stats);
    let timer = time_source.create_timer(
        delay_ms,
        INFINITE,
        Arc::new(move || {
            if !settled_for_fire.swap(true, Ordering::AcqRel) {
                stats_for_fire.fires.incr();
                callback();
            }
        }),
    )?;

    Ok(TimeoutHandle { timer, token: Cancellation { settled }, stats })
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
