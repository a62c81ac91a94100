// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-entry transaction classification.
//!
//! # Entry Shapes
//!
//! | Shape | Back-link | Role |
//! |-------|-----------|------|
//! | no lsid/txnNumber | - | `NonTxn` |
//! | lsid/txnNumber on a CRUD entry (retryable write) | - | `NonTxn` |
//! | `applyOps` | zero | `Single` |
//! | `applyOps` + `partialTxn` or `prepare` | zero | `FirstOfMulti` |
//! | `applyOps` + `partialTxn` or `prepare` | non-zero | `Continuation` |
//! | `applyOps` | non-zero | `FinalCommit` |
//! | `commitTransaction` | any | `FinalCommit` |
//! | `abortTransaction` | any | `FinalAbort` |

use crate::error::{MirrorError, Result};
use crate::oplog::Oplog;
use bson::{Bson, Document};
use std::fmt;
use tracing::{trace, warn};

const APPLY_OPS: &str = "applyOps";
const COMMIT_TRANSACTION: &str = "commitTransaction";
const ABORT_TRANSACTION: &str = "abortTransaction";

/// Transaction identity: (logical session id, transaction number).
///
/// The session id is kept as its encoded bytes so identities hash and compare
/// by value. The default value is "no identity".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TxnId {
    lsid: Vec<u8>,
    txn_number: i64,
}

impl TxnId {
    pub fn new(lsid: &Document, txn_number: i64) -> Result<Self> {
        let lsid = bson::to_vec(lsid).map_err(|e| MirrorError::parse("encode lsid", e))?;
        Ok(Self { lsid, txn_number })
    }

    pub fn is_zero(&self) -> bool {
        self.lsid.is_empty() && self.txn_number == 0
    }

    pub fn txn_number(&self) -> i64 {
        self.txn_number
    }

    /// Decoded session id document, if this is a live identity.
    pub fn lsid(&self) -> Option<Document> {
        if self.lsid.is_empty() {
            return None;
        }
        Document::from_reader(self.lsid.as_slice()).ok()
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lsid() {
            Some(lsid) => write!(f, "{}#{}", lsid, self.txn_number),
            None => write!(f, "<none>#{}", self.txn_number),
        }
    }
}

/// Where an entry sits within its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnRole {
    /// Not part of a transaction.
    NonTxn,
    /// The whole transaction in one entry.
    Single,
    /// First of several entries; more will follow.
    FirstOfMulti,
    /// A middle entry.
    Continuation,
    /// Last entry; the transaction committed.
    FinalCommit,
    /// Last entry; the transaction aborted.
    FinalAbort,
}

impl fmt::Display for TxnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonTxn => write!(f, "non_txn"),
            Self::Single => write!(f, "single"),
            Self::FirstOfMulti => write!(f, "first_of_multi"),
            Self::Continuation => write!(f, "continuation"),
            Self::FinalCommit => write!(f, "final_commit"),
            Self::FinalAbort => write!(f, "final_abort"),
        }
    }
}

/// Immutable classification of one oplog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    id: TxnId,
    role: TxnRole,
    multi_op: bool,
}

impl Meta {
    fn non_txn() -> Self {
        Self {
            id: TxnId::default(),
            role: TxnRole::NonTxn,
            multi_op: false,
        }
    }

    /// Decode and classify a raw entry.
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::from_oplog(&Oplog::from_document(doc)?)
    }

    /// Classify an entry.
    pub fn from_oplog(op: &Oplog) -> Result<Self> {
        if !op.is_command() {
            if op.lsid.is_some() && op.txn_number.is_some() {
                trace!(ns = %op.ns, op = %op.op, "Retryable write, not a transaction");
            }
            return Ok(Self::non_txn());
        }

        let command = match op.command_name() {
            Some(name @ (APPLY_OPS | COMMIT_TRANSACTION | ABORT_TRANSACTION)) => name,
            _ => return Ok(Self::non_txn()),
        };

        let (lsid, txn_number) = match (&op.lsid, op.txn_number) {
            (Some(lsid), Some(n)) => (lsid, n),
            (None, None) => return Ok(Self::non_txn()),
            (lsid, n) => {
                warn!(
                    ns = %op.ns,
                    command,
                    has_lsid = lsid.is_some(),
                    has_txn_number = n.is_some(),
                    "Ambiguous session metadata on command entry, treating as non-transactional"
                );
                return Ok(Self::non_txn());
            }
        };

        let id = TxnId::new(lsid, txn_number)?;
        let has_prev = op.has_prev_op_time();

        let (role, multi_op) = match command {
            APPLY_OPS => {
                let partial = flag(&op.o, "partialTxn")?;
                let prepare = flag(&op.o, "prepare")?;
                let commits = !partial && !prepare;
                match (has_prev, commits) {
                    (false, true) => (TxnRole::Single, false),
                    (false, false) => (TxnRole::FirstOfMulti, true),
                    (true, false) => (TxnRole::Continuation, true),
                    (true, true) => (TxnRole::FinalCommit, true),
                }
            }
            COMMIT_TRANSACTION => (TxnRole::FinalCommit, has_prev),
            _ => (TxnRole::FinalAbort, has_prev),
        };

        Ok(Self { id, role, multi_op })
    }

    pub fn id(&self) -> &TxnId {
        &self.id
    }

    pub fn role(&self) -> TxnRole {
        self.role
    }

    pub fn is_txn(&self) -> bool {
        self.role != TxnRole::NonTxn
    }

    /// True when the transaction spans more than one entry.
    pub fn is_multi_op(&self) -> bool {
        self.multi_op
    }

    /// True for the entry that opens a transaction's state.
    pub fn is_first(&self) -> bool {
        matches!(self.role, TxnRole::Single | TxnRole::FirstOfMulti)
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self.role,
            TxnRole::Single | TxnRole::FinalCommit | TxnRole::FinalAbort
        )
    }

    pub fn is_commit(&self) -> bool {
        matches!(self.role, TxnRole::Single | TxnRole::FinalCommit)
    }

    pub fn is_abort(&self) -> bool {
        self.role == TxnRole::FinalAbort
    }
}

/// Read an optional boolean flag from a command body.
fn flag(body: &Document, key: &str) -> Result<bool> {
    match body.get(key) {
        None | Some(Bson::Null) => Ok(false),
        Some(Bson::Boolean(b)) => Ok(*b),
        Some(other) => Err(MirrorError::parse(
            format!("applyOps field {}", key),
            format!("expected bool, got {:?}", other.element_type()),
        )),
    }
}
