//! Ordered replay of oplog entries onto the destination.
//!
//! Non-transactional entries are accumulated and sent as applyOps batches.
//! Transactional entries are held in the [`Buffer`] until their final entry
//! arrives; a commit flushes whatever is pending (so ordering is preserved),
//! then streams the transaction's operations out in batches of their own.
//!
//! # Design
//!
//! ```text
//! Oplog ──► Meta::from_oplog ──┬── non-txn ──► pending batch ──┐
//!                              │                 (ops / bytes) │
//!                              │                               ▼
//!                              └── txn ──► Buffer ──commit──► flush ──► Executor::apply_ops
//!                                            │                  │
//!                                            └──abort──► purge  └──► TxnStream batches ──► purge
//! ```

use crate::config::ReplayConfig;
use crate::destination::CommandRunner;
use crate::error::Result;
use crate::executor::Executor;
use crate::oplog::Oplog;
use crate::txn::{Buffer, Meta};
use bson::{Document, Timestamp};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Counters for one replayer's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries passed to [`TxnReplayer::apply`].
    pub entries: usize,
    /// Non-transactional operations sent.
    pub ops_applied: usize,
    /// Transactional entries buffered.
    pub txn_entries: usize,
    /// Operations sent on behalf of committed transactions.
    pub txn_ops_applied: usize,
    pub committed: usize,
    pub aborted: usize,
    /// applyOps commands sent.
    pub batches: usize,
}

/// Accumulated applyOps entries awaiting a flush.
#[derive(Debug, Default)]
struct Pending {
    docs: Vec<Document>,
    bytes: usize,
    last_ts: Option<Timestamp>,
}

impl Pending {
    fn would_overflow(&self, config: &ReplayConfig, len: usize) -> bool {
        !self.docs.is_empty()
            && (self.docs.len() >= config.max_batch_ops || self.bytes + len > config.max_batch_bytes)
    }

    fn push(&mut self, op: &Oplog, len: usize) -> Result<()> {
        self.docs.push(op.to_document()?);
        self.bytes += len;
        self.last_ts = Some(op.ts);
        Ok(())
    }
}

/// Applies oplog entries in order, reconstructing transactions on the way.
pub struct TxnReplayer<C: CommandRunner> {
    executor: Arc<Executor<C>>,
    buffer: Buffer,
    config: ReplayConfig,
    pending: Pending,
    stats: ReplayStats,
    last_applied_ts: Option<Timestamp>,
}

impl<C: CommandRunner> TxnReplayer<C> {
    pub fn new(executor: Arc<Executor<C>>, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            executor,
            buffer: Buffer::new(),
            config,
            pending: Pending::default(),
            stats: ReplayStats::default(),
            last_applied_ts: None,
        })
    }

    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Timestamp of the newest entry known to be applied on the destination.
    pub fn last_applied_ts(&self) -> Option<Timestamp> {
        self.last_applied_ts
    }

    /// Number of non-transactional entries waiting for a flush.
    pub fn pending_len(&self) -> usize {
        self.pending.docs.len()
    }

    /// Feed the next entry, in oplog order.
    pub async fn apply(&mut self, op: Oplog) -> Result<()> {
        let meta = Meta::from_oplog(&op)?;
        self.stats.entries += 1;

        if !meta.is_txn() {
            let len = op.encoded_len()?;
            if self.pending.would_overflow(&self.config, len) {
                self.flush().await?;
            }
            self.pending.push(&op, len)?;
            self.stats.ops_applied += 1;
            return Ok(());
        }

        let ts = op.ts;
        self.buffer.add_op(&meta, op)?;
        self.stats.txn_entries += 1;

        if meta.is_commit() {
            self.flush().await?;
            self.apply_committed(&meta).await?;
            self.buffer.purge(&meta)?;
            self.stats.committed += 1;
            self.last_applied_ts = Some(ts);
        } else if meta.is_abort() {
            self.buffer.purge(&meta)?;
            self.stats.aborted += 1;
        }
        Ok(())
    }

    /// Send every pending non-transactional entry.
    #[instrument(skip(self), fields(ops = self.pending.docs.len()))]
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.docs.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        debug!(ops = pending.docs.len(), bytes = pending.bytes, "Flushing applyOps batch");
        self.executor.apply_ops(&pending.docs).await?;
        self.stats.batches += 1;
        if pending.last_ts.is_some() {
            self.last_applied_ts = pending.last_ts;
        }
        Ok(())
    }

    async fn apply_committed(&mut self, meta: &Meta) -> Result<()> {
        let mut batch = Pending::default();
        for op in self.buffer.stream(meta)? {
            let op = op?;
            let len = op.encoded_len()?;
            if batch.would_overflow(&self.config, len) {
                self.send_txn_batch(std::mem::take(&mut batch)).await?;
            }
            batch.push(&op, len)?;
        }
        if !batch.docs.is_empty() {
            self.send_txn_batch(batch).await?;
        }
        Ok(())
    }

    async fn send_txn_batch(&mut self, batch: Pending) -> Result<()> {
        self.executor.apply_ops(&batch.docs).await?;
        self.stats.batches += 1;
        self.stats.txn_ops_applied += batch.docs.len();
        Ok(())
    }

    /// Flush pending entries and log the lifetime counters.
    ///
    /// Transactions still buffered are left in place; their entries will be
    /// seen again by a tailer restarting from [`Buffer::oldest_active_ts`].
    pub async fn finish(&mut self) -> Result<ReplayStats> {
        self.flush().await?;
        info!(
            entries = self.stats.entries,
            ops = self.stats.ops_applied,
            txn_ops = self.stats.txn_ops_applied,
            committed = self.stats.committed,
            aborted = self.stats.aborted,
            batches = self.stats.batches,
            in_flight = self.buffer.len(),
            "Replay finished"
        );
        Ok(self.stats.clone())
    }
}
