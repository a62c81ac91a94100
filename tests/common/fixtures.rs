//! Oplog entry builders.
//!
//! Transactional entries follow what a 4.2+ primary writes:
//!
//! ```text
//! small, committed:           applyOps
//! small, prepared, committed: applyOps{prepare} ─► commitTransaction
//! large, committed:           applyOps{partialTxn} ─► ... ─► applyOps
//! large, prepared, committed: applyOps{partialTxn} ─► ... ─► applyOps{prepare} ─► commitTransaction
//! ```
//!
//! Every entry after the first carries a `prevOpTime` pointing at the one
//! before it.
#![allow(dead_code)]

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document, Timestamp};
use oplog_mirror::Oplog;

pub fn ts(time: u32) -> Timestamp {
    Timestamp { time, increment: 1 }
}

/// A session id distinct per `n`.
pub fn lsid(n: u8) -> Document {
    doc! {
        "id": Binary { subtype: BinarySubtype::Uuid, bytes: vec![n; 16] },
        "uid": Binary { subtype: BinarySubtype::Generic, bytes: vec![0xAB; 32] },
    }
}

fn decode(d: Document) -> Oplog {
    Oplog::from_document(&d).expect("fixture must decode")
}

/// A plain insert of `{_id: id}` into `ns`.
pub fn insert(ns: &str, id: i32, at: u32) -> Oplog {
    decode(doc! {
        "ts": ts(at),
        "t": 1_i64,
        "v": 2,
        "op": "i",
        "ns": ns,
        "o": { "_id": id },
    })
}

/// A retryable-write insert: session fields on a CRUD entry.
pub fn retryable_insert(ns: &str, id: i32, at: u32, session: u8, txn: i64) -> Oplog {
    let mut op = insert(ns, id, at);
    op.lsid = Some(lsid(session));
    op.txn_number = Some(txn);
    op
}

/// The inner operations `{op: i, ns, o: {_id}}` for each id.
pub fn inner_inserts(ns: &str, ids: &[i32]) -> Vec<Bson> {
    ids.iter()
        .map(|id| Bson::Document(doc! { "op": "i", "ns": ns, "o": { "_id": *id } }))
        .collect()
}

/// Options for one transactional command entry.
#[derive(Debug, Clone, Copy)]
pub struct TxnEntry {
    pub session: u8,
    pub txn: i64,
    pub at: u32,
    pub prev: Option<u32>,
}

impl TxnEntry {
    pub fn new(session: u8, txn: i64, at: u32) -> Self {
        Self {
            session,
            txn,
            at,
            prev: None,
        }
    }

    pub fn after(mut self, prev: u32) -> Self {
        self.prev = Some(prev);
        self
    }

    fn build(self, o: Document) -> Oplog {
        let mut d = doc! {
            "ts": ts(self.at),
            "t": 1_i64,
            "h": 0_i64,
            "v": 2,
            "op": "c",
            "ns": "admin.$cmd",
            "o": o,
            "lsid": lsid(self.session),
            "txnNumber": self.txn,
        };
        let prev = match self.prev {
            Some(p) => doc! { "ts": ts(p), "t": 1_i64 },
            // Servers write a null back-link on the first entry.
            None => doc! { "ts": Timestamp { time: 0, increment: 0 }, "t": -1_i64 },
        };
        d.insert("prevOpTime", prev);
        decode(d)
    }

    pub fn apply_ops(self, inner: Vec<Bson>) -> Oplog {
        self.build(doc! { "applyOps": inner })
    }

    pub fn partial(self, inner: Vec<Bson>) -> Oplog {
        self.build(doc! { "applyOps": inner, "partialTxn": true })
    }

    pub fn prepare(self, inner: Vec<Bson>) -> Oplog {
        self.build(doc! { "applyOps": inner, "prepare": true })
    }

    pub fn commit(self) -> Oplog {
        self.build(doc! { "commitTransaction": 1, "commitTimestamp": ts(self.at) })
    }

    pub fn abort(self) -> Oplog {
        self.build(doc! { "abortTransaction": 1 })
    }
}

/// Entries of a transaction inserting `chunks` into `ns`, one applyOps entry
/// per chunk, starting at time `start` with one second per entry.
///
/// With `prepared`, a `commitTransaction` entry follows the applyOps entries.
pub fn transaction(session: u8, txn: i64, start: u32, ns: &str, chunks: &[&[i32]], prepared: bool) -> Vec<Oplog> {
    let mut entries = Vec::new();
    let mut prev = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let at = start + i as u32;
        let mut entry = TxnEntry::new(session, txn, at);
        if let Some(p) = prev {
            entry = entry.after(p);
        }
        let inner = inner_inserts(ns, chunk);
        let last = i + 1 == chunks.len();
        entries.push(match (last, prepared) {
            (false, _) => entry.partial(inner),
            (true, false) => entry.apply_ops(inner),
            (true, true) => entry.prepare(inner),
        });
        prev = Some(at);
    }
    if prepared {
        let at = start + chunks.len() as u32;
        let mut entry = TxnEntry::new(session, txn, at);
        if let Some(p) = prev {
            entry = entry.after(p);
        }
        entries.push(entry.commit());
    }
    entries
}

/// The `_id` of each operation.
pub fn ids(ops: &[Oplog]) -> Vec<i32> {
    ops.iter()
        .map(|op| op.o.get_i32("_id").expect("fixture op has an int _id"))
        .collect()
}
