// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chronid: injectable time, UUIDv7, hybrid logical clocks, and vector
//! clocks for ordering events across a distributed system.
//!
//! [`time`] is the one external dependency every other component takes,
//! as either [`time::SystemTimeSource`] (real wall time, OS timers) or
//! [`time::SimulatedTimeSource`] (deterministic, manually advanced).
//! [`uuid7`], [`hlc`], and [`vector_clock`] build on top of it to offer
//! three different ways of ordering events: globally sortable identifiers,
//! a scalar clock bounded by drift, and a full partial order.

pub mod error;
pub mod hlc;
pub mod stats;
pub mod time;
pub mod uuid7;
pub mod vector_clock;

pub use error::{Error, Result};
pub use hlc::{HlcClusterRegistry, HlcConfig, HlcCoordinator, HlcFactory, HlcTimestamp};
pub use time::{
    create_timeout, create_timeout_handle, Cancellation, SimulatedTimeSource, SimulatedTimeStats, SystemTimeSource,
    SystemTimeStats, TimeSource, Timer, TimeoutHandle, TimeoutStats,
};
pub use uuid7::{OsRandomSource, OverflowPolicy, RandomSource, UuidV7, UuidV7Factory};
pub use vector_clock::{ClockOrdering, VectorClock, VectorClockCoordinator, VectorClockHeader};
