// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real wall time and OS-backed timers.
//!
//! Delegates wall time to [`chrono::Utc::now`] and drives each timer with a
//! dedicated background thread parked on a [`Condvar`], matching the
//! "system delegates to the host clock and OS timer facility" requirement.
//! [`simulated`](super::simulated) is the variant used by tests and anything
//! that needs reproducible timer firing order.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};

use super::{validate_due_period, TimeSource, Timer, TimerCallback, INFINITE};
use crate::error::Result;
use crate::stats::Counter;

/// Counters for [`SystemTimeSource`]'s timer activity.
#[derive(Debug, Default)]
pub struct SystemTimeStats {
    pub timers_created: Counter,
    pub timers_changed: Counter,
    pub timers_disposed: Counter,
    pub timers_fired: Counter,
}

/// Real wall time, backed by [`chrono::Utc`], with timers run on background
/// threads parked on a condition variable.
pub struct SystemTimeSource {
    start: Instant,
    stats: Arc<SystemTimeStats>,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        SystemTimeSource { start: Instant::now(), stats: Arc::new(SystemTimeStats::default()) }
    }

    pub fn stats(&self) -> &SystemTimeStats {
        &self.stats
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_ticks(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    fn create_timer(
        &self,
        due_ms: i64,
        period_ms: i64,
        callback: TimerCallback,
    ) -> Result<Arc<dyn Timer>> {
        validate_due_period(due_ms, period_ms)?;
        self.stats.timers_created.incr();
        Ok(SystemTimer::spawn(due_ms, period_ms, callback, Arc::clone(&self.stats)))
    }

    fn local_time_zone(&self) -> String {
        Local::now().format("%:z").to_string()
    }
}

struct TimerState {
    due_instant: Option<Instant>,
    period_ms: i64,
    disposed: bool,
    generation: u64,
}

struct SystemTimerShared {
    state: Mutex<TimerState>,
    cvar: Condvar,
}

/// A timer owned by a [`SystemTimeSource`]. Carries only a shared handle and
/// a stats reference; the background thread owns the actual scheduling loop.
struct SystemTimer {
    shared: Arc<SystemTimerShared>,
    stats: Arc<SystemTimeStats>,
}

fn due_instant_for(due_ms: i64) -> Option<Instant> {
    if due_ms == INFINITE {
        None
    } else {
        Some(Instant::now() + Duration::from_millis(due_ms as u64))
    }
}

impl SystemTimer {
    fn spawn(
        due_ms: i64,
        period_ms: i64,
        callback: TimerCallback,
        stats: Arc<SystemTimeStats>,
    ) -> Arc<dyn Timer> {
        let shared = Arc::new(SystemTimerShared {
            state: Mutex::new(TimerState {
                due_instant: due_instant_for(due_ms),
                period_ms,
                disposed: false,
                generation: 0,
            }),
            cvar: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread_stats = Arc::clone(&stats);
        thread::spawn(move || run_timer_thread(thread_shared, callback, thread_stats));

        Arc::new(SystemTimer { shared, stats })
    }
}

impl Timer for SystemTimer {
    fn change(&self, due_ms: i64, period_ms: i64) -> Result<bool> {
        validate_due_period(due_ms, period_ms)?;
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.disposed {
            return Ok(false);
        }
        state.due_instant = due_instant_for(due_ms);
        state.period_ms = period_ms;
        state.generation += 1;
        self.stats.timers_changed.incr();
        self.shared.cvar.notify_all();
        Ok(true)
    }

    fn dispose(&self) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.disposed {
            state.disposed = true;
            self.stats.timers_disposed.incr();
            self.shared.cvar.notify_all();
        }
    }
}

/// The per-timer background loop: wait until due, fire, reschedule or
/// dispose. A callback may re-enter `change`/`dispose` on this timer (or any
/// other); re-entrance is supported because the lock is released before the
/// callback runs.
fn run_timer_thread(shared: Arc<SystemTimerShared>, callback: TimerCallback, stats: Arc<SystemTimeStats>) {
    loop {
        let guard = match shared.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.disposed {
            return;
        }

        let Some(due) = guard.due_instant else {
            // Parked: wait to be woken by `change` or `dispose`, re-checking
            // periodically in case of spurious wakeups.
            let (_guard, _timeout) = match shared.cvar.wait_timeout(guard, Duration::from_secs(3600)) {
                Ok(r) => r,
                Err(poisoned) => poisoned.into_inner(),
            };
            continue;
        };

        let now = Instant::now();
        if now < due {
            let wait_for = due - now;
            let (_guard, _timeout) = match shared.cvar.wait_timeout(guard, wait_for) {
                Ok(r) => r,
                Err(poisoned) => poisoned.into_inner(),
            };
            continue;
        }

        let generation = guard.generation;
        let period_ms = guard.period_ms;
        drop(guard);

        callback();
        stats.timers_fired.incr();

        let mut guard = match shared.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.disposed {
            return;
        }
        if guard.generation != generation {
            // Rescheduled mid-callback; pick up the new schedule.
            continue;
        }
        if period_ms == INFINITE {
            guard.disposed = true;
            stats.timers_disposed.incr();
            return;
        }
        guard.due_instant = Some(Instant::now() + Duration::from_millis(period_ms as u64));
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
