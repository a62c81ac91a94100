// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Oplog entry model.
//!
//! An [`Oplog`] is one record of the source's operation log. Field names on
//! the wire are the server's (`t`, `h`, `txnNumber`, ...); the Rust names are
//! spelled out.
//!
//! ```text
//! { ts: Timestamp, t: 3, h: 0, v: 2, op: "c", ns: "admin.$cmd",
//!   lsid: { id: UUID, uid: BinData }, txnNumber: 7, stmtId: 0,
//!   prevOpTime: { ts: Timestamp(0, 0), t: -1 },
//!   o: { applyOps: [ {op: "i", ns: "db.coll", o: {...}} ], partialTxn: true } }
//! ```

use crate::error::{MirrorError, Result};
use bson::{doc, Binary, Document, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum size of a single BSON document accepted by the server (16 MiB).
pub const MAX_BSON_SIZE: usize = 16 * 1024 * 1024;

fn zero_timestamp() -> Timestamp {
    Timestamp {
        time: 0,
        increment: 0,
    }
}

/// Returns true for `Timestamp(0, 0)`.
pub fn is_zero_timestamp(ts: &Timestamp) -> bool {
    ts.time == 0 && ts.increment == 0
}

/// A point in the oplog: timestamp plus election term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpTime {
    #[serde(default = "zero_timestamp")]
    pub ts: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<i64>,
}

impl OpTime {
    /// A zero timestamp means "no previous entry".
    ///
    /// The term is ignored: servers write `t: -1` on the null back-link.
    pub fn is_zero(&self) -> bool {
        is_zero_timestamp(&self.ts)
    }
}

/// One oplog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oplog {
    #[serde(default = "zero_timestamp")]
    pub ts: Timestamp,

    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub term: Option<i64>,

    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<i64>,

    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,

    /// Operation type: `i`, `u`, `d`, `c`, or `n`.
    pub op: String,

    #[serde(default)]
    pub ns: String,

    /// Collection UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Binary>,

    #[serde(default)]
    pub o: Document,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o2: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsid: Option<Document>,

    #[serde(
        rename = "txnNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub txn_number: Option<i64>,

    #[serde(rename = "stmtId", default, skip_serializing_if = "Option::is_none")]
    pub stmt_id: Option<i32>,

    #[serde(
        rename = "prevOpTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prev_op_time: Option<OpTime>,
}

impl Oplog {
    /// Decode an entry from a raw document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        bson::from_document(doc.clone()).map_err(|e| MirrorError::parse("decode oplog entry", e))
    }

    /// Encode the entry back into a document.
    pub fn to_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }

    /// An `n` entry carrying only a message.
    pub fn noop(msg: impl Into<String>) -> Self {
        Self {
            ts: zero_timestamp(),
            term: None,
            hash: None,
            version: None,
            op: "n".to_string(),
            ns: String::new(),
            ui: None,
            o: doc! { "msg": msg.into() },
            o2: None,
            lsid: None,
            txn_number: None,
            stmt_id: None,
            prev_op_time: None,
        }
    }

    /// Encoded BSON length, used to bound applyOps batches.
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(bson::to_vec(self)?.len())
    }

    pub fn is_command(&self) -> bool {
        self.op == "c"
    }

    /// First key of the `o` body (the command name for `c` entries).
    pub fn command_name(&self) -> Option<&str> {
        self.o.keys().next().map(String::as_str)
    }

    /// True if the back-link points at an earlier entry.
    pub fn has_prev_op_time(&self) -> bool {
        self.prev_op_time.map_or(false, |p| !p.is_zero())
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::parse(&self.ns)
    }
}

/// A `db.collection` pair. The collection part may itself contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub db: String,
    pub coll: String,
}

impl Namespace {
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// Split on the first dot. A bare database name has an empty collection.
    pub fn parse(ns: &str) -> Self {
        match ns.split_once('.') {
            Some((db, coll)) => Self::new(db, coll),
            None => Self::new(ns, ""),
        }
    }

    /// The `<db>.$cmd` namespace used by command oplog entries.
    pub fn command(db: impl Into<String>) -> Self {
        Self::new(db, "$cmd")
    }

    pub fn is_system_js(&self) -> bool {
        self.coll == "system.js"
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coll.is_empty() {
            write!(f, "{}", self.db)
        } else {
            write!(f, "{}.{}", self.db, self.coll)
        }
    }
}
