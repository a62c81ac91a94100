//! # Oplog Mirror
//!
//! Transaction reconstruction and retryable replay of oplog entries against a
//! destination cluster.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                              oplog-mirror                                 │
//! │                                                                           │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────────────────┐  │
//! │  │ Meta        │───►│ Buffer       │───►│ TxnStream                    │  │
//! │  │ (classify)  │    │ (per txn id) │    │ (ordered inner operations)   │  │
//! │  └─────────────┘    └──────────────┘    └──────────────────────────────┘  │
//! │         │                                            │                    │
//! │         └─────────────── TxnReplayer ◄───────────────┘                    │
//! │                               │                                           │
//! │                               ▼                                           │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────────────────┐  │
//! │  │ classify    │◄───│ Executor     │───►│ CommandRunner                │  │
//! │  │ (DbError)   │    │ (retry loop) │    │ (destination seam)           │  │
//! │  └─────────────┘    └──────────────┘    └──────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Halves
//!
//! 1. **Transactions**: [`Meta`] classifies each entry, [`Buffer`] holds a
//!    transaction until it commits or aborts, [`TxnStream`] replays it.
//! 2. **Execution**: [`Executor`] runs destination commands, recovering the
//!    session and retrying through elections and network blips.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use oplog_mirror::{DryRunRunner, Executor, MirrorConfig, Oplog, TxnReplayer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> oplog_mirror::Result<()> {
//!     let config = MirrorConfig::default();
//!     let executor = Arc::new(Executor::new(Arc::new(DryRunRunner), config.executor)?);
//!     let mut replayer = TxnReplayer::new(executor, config.replay)?;
//!
//!     let entries: Vec<Oplog> = Vec::new(); // tailed from the source
//!     for entry in entries {
//!         replayer.apply(entry).await?;
//!     }
//!     replayer.finish().await?;
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod destination;
pub mod error;
pub mod executor;
pub mod index_spec;
pub mod metrics;
pub mod oplog;
pub mod replay;
pub mod resilience;
pub mod txn;

// Re-exports for convenience
pub use classify::{classify, is_duplicate_key, is_reconnectable, ErrorKind};
pub use config::{ExecutorConfig, MirrorConfig, ReplayConfig};
pub use destination::{ApplyOpsResponse, BuildInfo, CollectionInfo, CommandRunner, DryRunRunner};
pub use error::{DbError, DbResult, MirrorError, Result};
pub use executor::Executor;
pub use oplog::{Namespace, OpTime, Oplog};
pub use replay::{ReplayStats, TxnReplayer};
pub use resilience::RetryPolicy;
pub use txn::{Buffer, Meta, TxnId, TxnRole, TxnStream};
