//! Mock CommandRunner for testing.
//!
//! Records every command it receives and answers from a per-command script.
//! Commands without a scripted answer reply `{ok: 1}`.
//!
//! The majority no-op the executor writes while recovering a session is
//! scripted under the key [`PROBE`], separately from data-bearing applyOps.
#![allow(dead_code)]

use bson::{doc, Bson, Document};
use oplog_mirror::destination::{BoxFuture, CommandRunner};
use oplog_mirror::error::{DbError, DbResult, TransportKind};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Script key for the session recovery no-op.
pub const PROBE: &str = "probe";

/// A recorded run_command() call.
#[derive(Debug, Clone)]
pub struct CommandCall {
    pub db: String,
    pub key: String,
    pub command: Document,
}

#[derive(Debug, Clone)]
enum Answer {
    Once(DbResult<Document>),
    Always(DbResult<Document>),
}

/// Mock implementation of CommandRunner that records all calls.
///
/// # Example
/// ```rust,ignore
/// let mock = MockDestination::new();
/// mock.fail_times("drop", 2, not_master());
/// // ... run the executor ...
/// assert_eq!(mock.count("drop"), 3);
/// ```
#[derive(Default)]
pub struct MockDestination {
    calls: Mutex<Vec<CommandCall>>,
    script: Mutex<HashMap<String, VecDeque<Answer>>>,
}

impl MockDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one answer for `key`.
    pub fn push(&self, key: &str, answer: DbResult<Document>) {
        self.script
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(Answer::Once(answer));
    }

    /// Queue `times` copies of `err` for `key`.
    pub fn fail_times(&self, key: &str, times: usize, err: DbError) {
        for _ in 0..times {
            self.push(key, Err(err.clone()));
        }
    }

    /// Answer `key` with `answer` forever, after anything already queued.
    pub fn always(&self, key: &str, answer: DbResult<Document>) {
        self.script
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(Answer::Always(answer));
    }

    pub fn calls(&self) -> Vec<CommandCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls recorded under `key`, in order.
    pub fn calls_for(&self, key: &str) -> Vec<CommandCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.key == key)
            .collect()
    }

    pub fn count(&self, key: &str) -> usize {
        self.calls_for(key).len()
    }

    /// Sequence of script keys, for asserting interleavings.
    pub fn keys(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.key).collect()
    }

    fn answer(&self, key: &str) -> DbResult<Document> {
        let mut script = self.script.lock().unwrap();
        let queue = match script.get_mut(key) {
            Some(queue) => queue,
            None => return Ok(doc! { "ok": 1.0 }),
        };
        match queue.front().cloned() {
            Some(Answer::Always(answer)) => answer,
            Some(Answer::Once(answer)) => {
                queue.pop_front();
                answer
            }
            None => Ok(doc! { "ok": 1.0 }),
        }
    }
}

/// Script key for a command: its name, or [`PROBE`] for a lone no-op applyOps.
pub fn script_key(command: &Document) -> String {
    let name = command.keys().next().cloned().unwrap_or_default();
    if name == "applyOps" {
        if let Ok(ops) = command.get_array("applyOps") {
            let lone_noop = ops.len() == 1
                && ops[0]
                    .as_document()
                    .map_or(false, |op| matches!(op.get_str("op"), Ok("n")));
            if lone_noop {
                return PROBE.to_string();
            }
        }
    }
    name
}

impl CommandRunner for MockDestination {
    fn run_command(&self, db: &str, command: Document) -> BoxFuture<'_, Document> {
        let key = script_key(&command);
        let answer = self.answer(&key);
        self.calls.lock().unwrap().push(CommandCall {
            db: db.to_string(),
            key,
            command,
        });
        Box::pin(async move { answer })
    }
}

// =============================================================================
// Error and reply builders
// =============================================================================

pub fn not_master() -> DbError {
    DbError::command(10107, "not master")
}

pub fn network_timeout() -> DbError {
    DbError::transport(TransportKind::Timeout, "i/o timeout")
}

pub fn bad_value() -> DbError {
    DbError::command(2, "BadValue")
}

/// A reply whose only write error is a duplicate key at `index`.
pub fn duplicate_key_reply(index: i32) -> Document {
    doc! {
        "ok": 1.0,
        "n": index,
        "writeErrors": [
            { "index": index, "code": 11000, "errmsg": "E11000 duplicate key error collection" },
        ],
    }
}

/// An `ok: 0` reply with `code`.
pub fn error_reply(code: i32, errmsg: &str) -> Document {
    doc! { "ok": 0.0, "code": code, "errmsg": errmsg }
}

/// The `applyOps` array of a recorded call.
pub fn apply_ops_entries(call: &CommandCall) -> Vec<Document> {
    call.command
        .get_array("applyOps")
        .map(|ops| ops.iter().filter_map(Bson::as_document).cloned().collect())
        .unwrap_or_default()
}
