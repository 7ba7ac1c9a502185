// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable time source: the single external dependency every other
//! component in this crate consumes.
//!
//! Two implementations share the [`TimeSource`] interface: [`system`] (real
//! wall time and OS timers) and [`simulated`] (fully deterministic wall time
//! and a manually-advanced timer scheduler). [`timeout`] builds scoped
//! cancellation handles on top of either.

pub mod simulated;
pub mod system;
pub mod timeout;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub use simulated::{SimulatedTimeSource, SimulatedTimeStats};
pub use system::{SystemTimeSource, SystemTimeStats};
pub use timeout::{create_timeout, create_timeout_handle, Cancellation, TimeoutHandle, TimeoutStats};

/// Sentinel meaning "never" for a due time, or "one-shot" for a period.
pub const INFINITE: i64 = i64::MAX;

/// A timer callback. Takes no arguments; state is captured by the closure,
/// matching how the rest of this crate prefers closures over an explicit
/// `(callback, state)` pair.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// A handle to a single scheduled timer.
pub trait Timer: Send + Sync {
    /// Reschedules this timer to the given due time and period (both in
    /// milliseconds, or [`INFINITE`]). Returns `false` if the timer was
    /// already disposed.
    fn change(&self, due_ms: i64, period_ms: i64) -> Result<bool>;

    /// Cancels and releases the timer. Idempotent.
    fn dispose(&self);
}

/// An injectable source of wall time and a scheduler for timers.
pub trait TimeSource: Send + Sync {
    /// The current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// The current wall-clock time in milliseconds since the Unix epoch.
    fn now_utc_ms(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }

    /// A free-running monotonic tick counter, unaffected by wall-time edits.
    fn monotonic_ticks(&self) -> i64;

    /// Schedules a timer. `period_ms` of [`INFINITE`] means one-shot.
    fn create_timer(
        &self,
        due_ms: i64,
        period_ms: i64,
        callback: TimerCallback,
    ) -> Result<Arc<dyn Timer>>;

    /// Informational: the host's local time zone offset, e.g. `"+00:00"`.
    fn local_time_zone(&self) -> String;

    /// `true` for [`SimulatedTimeSource`]. Used by [`crate::uuid7`]'s `Auto`
    /// overflow policy to decide whether spin-waiting for the next
    /// millisecond could ever succeed.
    fn is_simulated(&self) -> bool {
        false
    }
}

pub(crate) fn validate_due_period(due_ms: i64, period_ms: i64) -> Result<()> {
    if due_ms < 0 && due_ms != INFINITE {
        return Err(Error::InvalidArgument(format!(
            "due_ms must be non-negative or INFINITE, got {due_ms}"
        )));
    }
    if period_ms < 0 && period_ms != INFINITE {
        return Err(Error::InvalidArgument(format!(
            "period_ms must be non-negative or INFINITE, got {period_ms}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
