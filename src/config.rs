// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the oplog mirror.
//!
//! Configuration is passed to [`Executor::new()`](crate::executor::Executor::new)
//! and [`TxnReplayer::new()`](crate::replay::TxnReplayer::new), and can be
//! constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use oplog_mirror::config::{MirrorConfig, ExecutorConfig};
//!
//! let config = MirrorConfig {
//!     executor: ExecutorConfig {
//!         min_retry_duration: "1m".into(),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! MirrorConfig
//! ├── executor: ExecutorConfig      # Retry floors and command toggles
//! └── replay: ReplayConfig          # applyOps batch limits
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! executor:
//!   min_attempts: 10
//!   min_retry_duration: "5m"
//!   recover_sleep: "5s"
//!   bypass_document_validation: true
//! replay:
//!   max_batch_ops: 1000
//!   max_batch_bytes: 15728640
//! ```

use crate::error::{MirrorError, Result};
use crate::oplog::MAX_BSON_SIZE;
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

impl MirrorConfig {
    /// Create a config with fast retry floors for tests.
    pub fn for_testing() -> Self {
        Self {
            executor: ExecutorConfig::for_testing(),
            replay: ReplayConfig::default(),
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.executor.validate()?;
        self.replay.validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ExecutorConfig: retry floors and destination command toggles
// ═══════════════════════════════════════════════════════════════════════════════

/// Retryable executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Least number of command retries before giving up.
    #[serde(default = "default_min_attempts")]
    pub min_attempts: usize,

    /// Least number of reconnect probes before giving up.
    #[serde(default = "default_min_attempts")]
    pub min_reconnect_attempts: usize,

    /// Least time spent retrying, as a duration string (e.g., "5m").
    #[serde(default = "default_min_retry_duration")]
    pub min_retry_duration: String,

    /// Pause before each reconnect probe, as a duration string (e.g., "5s").
    #[serde(default = "default_recover_sleep")]
    pub recover_sleep: String,

    /// Send `bypassDocumentValidation: true` with data-bearing applyOps.
    #[serde(default = "default_true")]
    pub bypass_document_validation: bool,

    /// Prefix for the temporary name a collection is renamed to before a drop.
    #[serde(default = "default_drop_pending_prefix")]
    pub drop_pending_prefix: String,

    /// Name used for the destination in logs and errors.
    #[serde(default = "default_destination_name")]
    pub destination_name: String,

    /// Message carried by the no-op entries the executor writes.
    #[serde(default = "default_noop_message")]
    pub noop_message: String,
}

fn default_min_attempts() -> usize {
    10
}

fn default_min_retry_duration() -> String {
    "5m".to_string()
}

fn default_recover_sleep() -> String {
    "5s".to_string()
}

fn default_true() -> bool {
    true
}

fn default_drop_pending_prefix() -> String {
    "_oplog_mirror_drop_pending_".to_string()
}

fn default_destination_name() -> String {
    "destination".to_string()
}

fn default_noop_message() -> String {
    "oplog-mirror noop".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_attempts: default_min_attempts(),
            min_reconnect_attempts: default_min_attempts(),
            min_retry_duration: default_min_retry_duration(),
            recover_sleep: default_recover_sleep(),
            bypass_document_validation: true,
            drop_pending_prefix: default_drop_pending_prefix(),
            destination_name: default_destination_name(),
            noop_message: default_noop_message(),
        }
    }
}

impl ExecutorConfig {
    /// Fast floors for tests.
    pub fn for_testing() -> Self {
        let policy = RetryPolicy::testing();
        Self {
            min_attempts: policy.min_attempts,
            min_reconnect_attempts: policy.min_reconnect_attempts,
            min_retry_duration: "100ms".to_string(),
            recover_sleep: "10ms".to_string(),
            ..Default::default()
        }
    }

    /// Parse the min_retry_duration string to a Duration.
    pub fn min_retry_duration(&self) -> Duration {
        humantime::parse_duration(&self.min_retry_duration).unwrap_or(Duration::from_secs(300))
    }

    /// Parse the recover_sleep string to a Duration.
    pub fn recover_sleep(&self) -> Duration {
        humantime::parse_duration(&self.recover_sleep).unwrap_or(Duration::from_secs(5))
    }

    /// Retry floors derived from this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            min_attempts: self.min_attempts,
            min_reconnect_attempts: self.min_reconnect_attempts,
            min_duration: self.min_retry_duration(),
            recover_sleep: self.recover_sleep(),
        }
    }

    /// Reject unparsable durations and empty names.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("min_retry_duration", &self.min_retry_duration),
            ("recover_sleep", &self.recover_sleep),
        ] {
            humantime::parse_duration(value).map_err(|e| {
                MirrorError::Config(format!("executor.{} {:?}: {}", field, value, e))
            })?;
        }
        if self.drop_pending_prefix.is_empty() {
            return Err(MirrorError::Config(
                "executor.drop_pending_prefix must not be empty".to_string(),
            ));
        }
        if self.noop_message.is_empty() {
            return Err(MirrorError::Config(
                "executor.noop_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplayConfig: applyOps batching
// ═══════════════════════════════════════════════════════════════════════════════

/// Transaction replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Maximum entries per applyOps batch.
    #[serde(default = "default_max_batch_ops")]
    pub max_batch_ops: usize,

    /// Maximum encoded bytes per applyOps batch.
    ///
    /// Must leave [`BATCH_HEADROOM`] under the 16 MiB document ceiling.
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
}

/// Upper bound on `max_batch_ops`.
pub const MAX_BATCH_OPS: usize = 100_000;

/// Bytes kept free under [`MAX_BSON_SIZE`] for what batch accounting does not
/// count: array index keys (at most 7 bytes each for [`MAX_BATCH_OPS`]
/// elements), the trailing no-op entry and the command wrapper.
pub const BATCH_HEADROOM: usize = 1024 * 1024;

fn default_max_batch_ops() -> usize {
    1000
}

fn default_max_batch_bytes() -> usize {
    15 * 1024 * 1024
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_batch_ops: default_max_batch_ops(),
            max_batch_bytes: default_max_batch_bytes(),
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_ops == 0 || self.max_batch_ops > MAX_BATCH_OPS {
            return Err(MirrorError::Config(format!(
                "replay.max_batch_ops must be between 1 and {}, got {}",
                MAX_BATCH_OPS, self.max_batch_ops
            )));
        }
        let limit = MAX_BSON_SIZE - BATCH_HEADROOM;
        if self.max_batch_bytes == 0 || self.max_batch_bytes > limit {
            return Err(MirrorError::Config(format!(
                "replay.max_batch_bytes must be between 1 and {} bytes, got {}",
                limit, self.max_batch_bytes
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
