// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for chronid operations.

use thiserror::Error;

/// All possible errors that can occur in chronid operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}\n  hint: durations and due times must be non-negative or infinite")]
    InvalidArgument(String),

    #[error("uuidv7 counter overflow at wall time {wall_time_ms}\n  hint: configure a non-Throw overflow policy if this is expected under load")]
    CounterOverflow { wall_time_ms: i64 },

    #[error("hlc drift exceeded: logical clock is {actual}ms ahead of physical time (max {max}ms)\n  hint: raise max_drift_ms or investigate clock skew")]
    HlcDriftExceeded { actual: i64, max: i64 },

    #[error("vector clock capacity exceeded: cannot track more than {limit} node ids")]
    CapacityExceeded { limit: usize },

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// A specialized Result type for chronid operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
