// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transaction buffer.
//!
//! Accumulates the entries of in-flight transactions until their final entry
//! arrives, then hands out a one-shot ordered read of the reconstructed
//! operations.
//!
//! # State Machine (per identity)
//!
//! ```text
//!            first (multi)          final commit/abort
//!   absent ───────────────► buffering ───────────────► finalized
//!     │                                                   │
//!     └──────────── single / abort ─────────────────────► │
//!                                                         │ purge
//!   absent ◄──────────────────────────────────────────────┘
//! ```
//!
//! The map is sharded ([`DashMap`]) so different identities never contend.
//! On commit the entries are frozen into an `Arc<[Oplog]>`; a [`TxnStream`]
//! holds its own reference and reads without touching the map.

use super::meta::{Meta, TxnId, TxnRole};
use crate::error::{MirrorError, Result};
use crate::metrics;
use crate::oplog::Oplog;
use bson::{Bson, Timestamp};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
enum Phase {
    Buffering(Vec<Oplog>),
    Committed(Arc<[Oplog]>),
    Aborted,
}

/// Buffered state for one transaction.
#[derive(Debug)]
struct TxnState {
    phase: Phase,
    /// Timestamp of the first entry seen for this identity.
    first_ts: Timestamp,
}

impl TxnState {
    fn is_finalized(&self) -> bool {
        !matches!(self.phase, Phase::Buffering(_))
    }
}

/// Per-identity accumulation of transaction entries.
#[derive(Debug, Default)]
pub struct Buffer {
    txns: DashMap<TxnId, TxnState>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to its transaction's state.
    ///
    /// Fails for non-transactional entries, for a continuation or commit with
    /// no live state, for a first entry colliding with a live state, and for
    /// any append after the transaction was finalized. An abort with no live
    /// state is accepted: the transaction may have aborted before writing any
    /// entry we saw.
    pub fn add_op(&self, meta: &Meta, op: Oplog) -> Result<()> {
        let id = meta.id();
        match meta.role() {
            TxnRole::NonTxn => {
                return Err(MirrorError::state(id, "entry is not part of a transaction"));
            }
            TxnRole::Single | TxnRole::FirstOfMulti => match self.txns.entry(id.clone()) {
                Entry::Occupied(_) => {
                    return Err(MirrorError::state(
                        id,
                        "first entry collides with a live transaction",
                    ));
                }
                Entry::Vacant(slot) => {
                    let first_ts = op.ts;
                    let phase = if meta.role() == TxnRole::Single {
                        metrics::record_txn_finalized("commit", 1);
                        Phase::Committed(Arc::from(vec![op]))
                    } else {
                        Phase::Buffering(vec![op])
                    };
                    slot.insert(TxnState { phase, first_ts });
                }
            },
            TxnRole::Continuation | TxnRole::FinalCommit => {
                let mut state = self.txns.get_mut(id).ok_or_else(|| {
                    MirrorError::state(id, "no live transaction for continuation entry")
                })?;
                let entries = match &mut state.phase {
                    Phase::Buffering(entries) => entries,
                    _ => {
                        return Err(MirrorError::state(
                            id,
                            "append after the transaction was finalized",
                        ))
                    }
                };
                entries.push(op);
                if meta.role() == TxnRole::FinalCommit {
                    let frozen: Arc<[Oplog]> = Arc::from(std::mem::take(entries));
                    debug!(txn = %id, entries = frozen.len(), "Transaction committed");
                    metrics::record_txn_finalized("commit", frozen.len());
                    state.phase = Phase::Committed(frozen);
                }
            }
            TxnRole::FinalAbort => match self.txns.entry(id.clone()) {
                Entry::Occupied(mut slot) => {
                    let state = slot.get_mut();
                    let entries = match &state.phase {
                        Phase::Buffering(entries) => entries.len(),
                        _ => {
                            return Err(MirrorError::state(
                                id,
                                "append after the transaction was finalized",
                            ))
                        }
                    };
                    debug!(txn = %id, entries, "Transaction aborted");
                    metrics::record_txn_finalized("abort", entries);
                    state.phase = Phase::Aborted;
                }
                Entry::Vacant(slot) => {
                    debug!(txn = %id, "Transaction aborted with no buffered entries");
                    metrics::record_txn_finalized("abort", 0);
                    slot.insert(TxnState {
                        phase: Phase::Aborted,
                        first_ts: op.ts,
                    });
                }
            },
        }

        metrics::record_txn_entry_buffered(&meta.role().to_string());
        metrics::set_active_txns(self.txns.len());
        Ok(())
    }

    /// Open a one-shot ordered read of a committed transaction's operations.
    pub fn stream(&self, meta: &Meta) -> Result<TxnStream> {
        let id = meta.id();
        let state = self
            .txns
            .get(id)
            .ok_or_else(|| MirrorError::state(id, "no transaction state to stream"))?;
        match &state.phase {
            Phase::Committed(entries) => Ok(TxnStream::new(id.clone(), Arc::clone(entries))),
            Phase::Buffering(_) => Err(MirrorError::state(id, "transaction is not finalized")),
            Phase::Aborted => Err(MirrorError::state(id, "transaction was aborted")),
        }
    }

    /// Remove all state for the transaction. Absent identities are a no-op.
    pub fn purge(&self, meta: &Meta) -> Result<()> {
        if let Some((id, state)) = self.txns.remove(meta.id()) {
            if !state.is_finalized() {
                warn!(txn = %id, "Purging a transaction that never finalized");
            }
            debug!(txn = %id, "Purged transaction state");
            metrics::record_txn_purged();
            metrics::set_active_txns(self.txns.len());
        }
        Ok(())
    }

    /// Number of identities with live state.
    pub fn len(&self) -> usize {
        self.txns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    pub fn contains(&self, id: &TxnId) -> bool {
        self.txns.contains_key(id)
    }

    /// Timestamp of the first entry of the oldest transaction not yet applied.
    ///
    /// A tailer restarting from before this point sees every entry of every
    /// in-flight transaction again. Aborted transactions are ignored.
    pub fn oldest_active_ts(&self) -> Option<Timestamp> {
        self.txns
            .iter()
            .filter(|entry| !matches!(entry.value().phase, Phase::Aborted))
            .map(|entry| entry.value().first_ts)
            .min_by_key(|ts| (ts.time, ts.increment))
    }
}

/// Lazy ordered read over a committed transaction's inner operations.
///
/// Yields `Ok` items in receipt order and ends with `None`, or yields a single
/// `Err` and then ends. Each inner operation inherits `ts`, `t`, and `h` from
/// the entry that carried it.
#[must_use = "a transaction stream must be drained before the transaction is purged"]
#[derive(Debug)]
pub struct TxnStream {
    id: TxnId,
    entries: Arc<[Oplog]>,
    entry_idx: usize,
    op_idx: usize,
    yielded: usize,
    done: bool,
}

enum Step {
    Item(Result<Oplog>),
    NextEntry,
    End,
}

impl TxnStream {
    fn new(id: TxnId, entries: Arc<[Oplog]>) -> Self {
        Self {
            id,
            entries,
            entry_idx: 0,
            op_idx: 0,
            yielded: 0,
            done: false,
        }
    }

    pub fn id(&self) -> &TxnId {
        &self.id
    }

    /// Collect every remaining operation, stopping at the first error.
    pub fn drain(self) -> Result<Vec<Oplog>> {
        self.collect()
    }

    fn step(&self) -> Step {
        let entry = match self.entries.get(self.entry_idx) {
            Some(entry) => entry,
            None => return Step::End,
        };
        match inner_ops(entry) {
            Err(e) => Step::Item(Err(e)),
            Ok(ops) => match ops.and_then(|ops| ops.get(self.op_idx)) {
                Some(raw) => Step::Item(decode_inner(entry, raw)),
                None => Step::NextEntry,
            },
        }
    }
}

impl Iterator for TxnStream {
    type Item = Result<Oplog>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.step() {
                Step::Item(Ok(op)) => {
                    self.op_idx += 1;
                    self.yielded += 1;
                    return Some(Ok(op));
                }
                Step::Item(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Step::NextEntry => {
                    self.entry_idx += 1;
                    self.op_idx = 0;
                }
                Step::End => {
                    self.done = true;
                    metrics::record_txn_ops_streamed(self.yielded);
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for TxnStream {}

impl Drop for TxnStream {
    fn drop(&mut self) {
        if !self.done && !std::thread::panicking() {
            warn!(
                txn = %self.id,
                yielded = self.yielded,
                "Transaction stream dropped before it was drained"
            );
        }
    }
}

/// The `applyOps` array of an entry; commit/abort commands carry none.
fn inner_ops(entry: &Oplog) -> Result<Option<&Vec<Bson>>> {
    if entry.command_name() != Some("applyOps") {
        return Ok(None);
    }
    entry
        .o
        .get_array("applyOps")
        .map(Some)
        .map_err(|e| MirrorError::parse("applyOps body", e))
}

fn decode_inner(parent: &Oplog, raw: &Bson) -> Result<Oplog> {
    let doc = raw.as_document().ok_or_else(|| {
        MirrorError::parse(
            "applyOps element",
            format!("expected document, got {:?}", raw.element_type()),
        )
    })?;
    let mut op = Oplog::from_document(doc)?;
    op.ts = parent.ts;
    op.term = parent.term;
    op.hash = parent.hash;
    Ok(op)
}
