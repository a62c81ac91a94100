// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Destination command seam.
//!
//! The executor never talks to a connection directly; it goes through a
//! [`CommandRunner`], which issues one database command and reports the raw
//! reply or a [`DbError`](crate::error::DbError). Production code wraps a driver client; tests use a
//! scripted mock.
//!
//! A runner returns `Ok(reply)` for any reply the server sent, including
//! `ok: 0` and replies carrying `writeErrors`/`writeConcernError`. Lifting
//! those into errors is the executor's job, so every runner behaves the same.
//!
//! # Example
//!
//! ```rust,no_run
//! use oplog_mirror::destination::{BoxFuture, CommandRunner};
//! use bson::{doc, Document};
//!
//! struct Echo;
//!
//! impl CommandRunner for Echo {
//!     fn run_command(&self, _db: &str, _command: Document) -> BoxFuture<'_, Document> {
//!         Box::pin(async { Ok(doc! { "ok": 1 }) })
//!     }
//! }
//! ```

use crate::error::{DbError, DbResult, MirrorError};
use bson::{doc, Binary, Bson, Document};
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = DbResult<T>> + Send + 'a>>;

/// What the executor needs from a destination connection.
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `command` against database `db` and return the server's reply.
    fn run_command(&self, db: &str, command: Document) -> BoxFuture<'_, Document>;
}

/// Logs commands and replies `{ok: 1}` without contacting anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run_command(&self, db: &str, command: Document) -> BoxFuture<'_, Document> {
        let db = db.to_string();
        Box::pin(async move {
            debug!(
                db = %db,
                command = command.keys().next().map(String::as_str).unwrap_or(""),
                "Dry run: would run command"
            );
            Ok(doc! { "ok": 1 })
        })
    }
}

/// Server version as reported by `buildInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub version_array: Vec<i32>,
}

impl BuildInfo {
    /// Read `version`/`versionArray` from a `buildInfo` reply.
    ///
    /// When `versionArray` is missing the dotted `version` string is parsed,
    /// stopping at the first non-numeric component.
    pub fn from_reply(reply: &Document) -> Self {
        let version = reply.get_str("version").unwrap_or_default().to_string();
        let version_array = match reply.get_array("versionArray") {
            Ok(parts) => parts.iter().filter_map(bson_to_i32).collect(),
            Err(_) => version
                .split('.')
                .map_while(|p| p.parse::<i32>().ok())
                .collect(),
        };
        Self {
            version,
            version_array,
        }
    }

    /// True if this version is greater than or equal to `target`.
    ///
    /// A version with fewer components than `target` never satisfies it.
    pub fn version_at_least(&self, target: &[i32]) -> bool {
        for (i, want) in target.iter().enumerate() {
            let have = match self.version_array.get(i) {
                Some(have) => *have,
                None => return false,
            };
            if have != *want {
                return have > *want;
            }
        }
        true
    }
}

/// Numeric reply field as `i32`; `None` if it is not a number or does not fit.
pub(crate) fn bson_to_i32(value: &Bson) -> Option<i32> {
    match value {
        Bson::Int32(v) => Some(*v),
        Bson::Int64(v) => i32::try_from(*v).ok(),
        Bson::Double(v) if v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX) => {
            Some(*v as i32)
        }
        _ => None,
    }
}

/// Servers report `ok` as a double, an integer or a boolean.
fn lenient_ok<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Bson::deserialize(deserializer)? {
        Bson::Double(v) => Ok(v),
        Bson::Int32(v) => Ok(f64::from(v)),
        Bson::Int64(v) => Ok(v as f64),
        Bson::Boolean(v) => Ok(if v { 1.0 } else { 0.0 }),
        other => Err(serde::de::Error::custom(format!("ok is not numeric: {}", other))),
    }
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    match Option::<Bson>::deserialize(deserializer)? {
        None | Some(Bson::Null) => Ok(None),
        Some(value) => bson_to_i32(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("not an int32: {}", value))),
    }
}

/// Reply of an `applyOps` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOpsResponse {
    #[serde(deserialize_with = "lenient_ok")]
    pub ok: f64,
    pub errmsg: Option<String>,
    #[serde(deserialize_with = "lenient_i32")]
    pub code: Option<i32>,
    /// Number of entries applied before any failure.
    #[serde(deserialize_with = "lenient_i32")]
    pub applied: Option<i32>,
    /// Per-entry success flags, in request order.
    pub results: Vec<bool>,
}

impl ApplyOpsResponse {
    /// Decode from a raw reply; unknown fields are ignored.
    pub fn from_reply(reply: &Document) -> DbResult<Self> {
        bson::from_document(reply.clone())
            .map_err(|e| DbError::Message(format!("malformed applyOps reply: {}", e)))
    }

    /// The server reply carried by a terminal applyOps failure.
    pub fn from_error(err: &MirrorError) -> Option<Self> {
        err.command_error()?
            .response()
            .and_then(|reply| Self::from_reply(reply).ok())
    }

    pub fn is_ok(&self) -> bool {
        self.ok == 1.0
    }

    /// Index of the first entry the server reported as failed.
    pub fn failed_index(&self) -> Option<usize> {
        self.results.iter().position(|ok| !ok)
    }
}

/// One entry of a `listCollections` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    /// `collection` or `view`.
    pub kind: String,
    pub options: Document,
    pub uuid: Option<Binary>,
}

impl CollectionInfo {
    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.get_str("name").ok()?.to_string();
        let kind = doc.get_str("type").unwrap_or("collection").to_string();
        let options = doc.get_document("options").cloned().unwrap_or_default();
        let uuid = match doc.get_document("info").ok().and_then(|info| info.get("uuid")) {
            Some(Bson::Binary(b)) => Some(b.clone()),
            _ => None,
        };
        Some(Self {
            name,
            kind,
            options,
            uuid,
        })
    }

    pub fn is_view(&self) -> bool {
        self.kind == "view"
    }
}
