// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry floors for destination commands and session recovery.
//!
//! A retry loop never gives up before *both* floors are exhausted: a minimum
//! number of attempts and a minimum elapsed time. A burst of fast failures
//! during an election therefore keeps retrying until the election window has
//! passed, and a slow network still gets its minimum number of tries.
//!
//! # Example
//!
//! ```rust
//! use oplog_mirror::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert!(!policy.command_floors_exhausted(3, Duration::from_secs(400)));
//! assert!(policy.command_floors_exhausted(10, Duration::from_secs(300)));
//! ```

use std::time::Duration;

/// Retry floors shared by the command loop and session recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Least number of command attempts after the first failure.
    pub min_attempts: usize,

    /// Least number of reconnect probes during one recovery.
    pub min_reconnect_attempts: usize,

    /// Least elapsed time, measured from the first failure, before giving up.
    pub min_duration: Duration,

    /// Pause before each reconnect probe.
    pub recover_sleep: Duration,
}

impl Default for RetryPolicy {
    /// Production floors.
    ///
    /// ```text
    /// Floor                   Value
    /// -----                   -----
    /// command attempts        10
    /// reconnect attempts      10
    /// elapsed time            5m
    /// sleep before probe      5s
    /// ```
    fn default() -> Self {
        Self {
            min_attempts: 10,
            min_reconnect_attempts: 10,
            min_duration: Duration::from_secs(5 * 60),
            recover_sleep: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Fast-fail floors for tests.
    pub fn testing() -> Self {
        Self {
            min_attempts: 3,
            min_reconnect_attempts: 2,
            min_duration: Duration::from_millis(100),
            recover_sleep: Duration::from_millis(10),
        }
    }

    /// Give up only after one attempt and no waiting.
    pub fn no_retry() -> Self {
        Self {
            min_attempts: 0,
            min_reconnect_attempts: 0,
            min_duration: Duration::ZERO,
            recover_sleep: Duration::ZERO,
        }
    }

    /// True once `attempts` retries and `elapsed` both meet their floors.
    pub fn command_floors_exhausted(&self, attempts: usize, elapsed: Duration) -> bool {
        attempts >= self.min_attempts && elapsed >= self.min_duration
    }

    /// Same as [`Self::command_floors_exhausted`] for reconnect probes.
    pub fn reconnect_floors_exhausted(&self, attempts: usize, elapsed: Duration) -> bool {
        attempts >= self.min_reconnect_attempts && elapsed >= self.min_duration
    }
}
