// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the oplog mirror.
//!
//! Two layers of errors live here:
//!
//! - [`DbError`]: the heterogeneous shapes a destination command can fail
//!   with (command errors, write errors, write-concern errors, composite
//!   write/bulk exceptions, transport failures, unstructured messages).
//!   These are produced by the [`CommandRunner`](crate::destination::CommandRunner)
//!   wrapper and interpreted **only** by [`crate::classify`].
//! - [`MirrorError`]: the crate-level error returned by every public API.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Parse` | No | Malformed oplog entry (format incompatibility) |
//! | `State` | No | Transaction buffer precondition violated (caller bug) |
//! | `Command` | Depends | Destination error; retryable if reconnectable |
//! | `RetriesExhausted` | No | Retry floors exhausted on a transient error |
//! | `ReconnectFailed` | No | Session recovery gave up |
//! | `EmptyApplyOps` | No | An applyOps batch with no entries |
//! | `Encode` | No | A document could not be encoded to BSON |
//! | `Config` | No | Configuration invalid |

use bson::Document;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for raw destination command execution.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Errors surfaced by the mirror core.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// An oplog entry could not be decoded into the expected shape.
    ///
    /// Fatal: signals a format incompatibility with the source, not a
    /// transient condition.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Transaction buffer precondition or ordering violation.
    ///
    /// Fatal: the caller fed entries out of order or skipped a step.
    #[error("Invalid transaction state ({txn}): {message}")]
    State { txn: String, message: String },

    /// The destination rejected a command.
    ///
    /// Retryable only if [`crate::classify::is_reconnectable`] says so, and
    /// the executor has already done that retrying by the time this escapes.
    #[error("Command error: {0}")]
    Command(#[from] DbError),

    /// A transient error persisted past both retry floors.
    #[error("gave up retrying after {attempts} failed attempts which took {elapsed:?}: {source}")]
    RetriesExhausted {
        attempts: usize,
        elapsed: Duration,
        #[source]
        source: DbError,
    },

    /// The destination session could not be recovered.
    #[error("gave up reconnecting to the {target} after {attempts} failed attempts which took {elapsed:?}: {source}")]
    ReconnectFailed {
        target: String,
        attempts: usize,
        elapsed: Duration,
        #[source]
        source: DbError,
    },

    /// An applyOps batch was requested with no entries.
    #[error("cannot send an empty applyOps")]
    EmptyApplyOps,

    /// A document could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] bson::ser::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Create a parse error with context.
    pub fn parse(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::Parse(format!("{}: {}", context, err))
    }

    /// Create a transaction state error.
    pub fn state(txn: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::State {
            txn: txn.to_string(),
            message: message.into(),
        }
    }

    /// The destination error, if this is a terminal command rejection.
    ///
    /// Wrapped errors (exhausted retries, failed reconnects) return `None`.
    pub fn command_error(&self) -> Option<&DbError> {
        match self {
            Self::Command(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this error is a duplicate key rejection.
    pub fn is_duplicate_key(&self) -> bool {
        self.command_error()
            .map_or(false, crate::classify::is_duplicate_key)
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Command(e) => crate::classify::is_reconnectable(e),
            Self::Parse(_) => false,
            Self::State { .. } => false,
            Self::RetriesExhausted { .. } => false,
            Self::ReconnectFailed { .. } => false,
            Self::EmptyApplyOps => false,
            Self::Encode(_) => false,
            Self::Config(_) => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Destination error shapes
// ═══════════════════════════════════════════════════════════════════════════════

/// A failed server command (`ok: 0`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandError {
    pub code: i32,
    pub code_name: Option<String>,
    pub message: String,
    /// Error labels attached by the server or driver (e.g. `NetworkError`).
    pub labels: Vec<String>,
    /// Raw server reply, when the wrapper kept it.
    pub response: Option<Document>,
}

impl CommandError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_response(mut self, response: Document) -> Self {
        self.response = Some(response);
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code_name {
            Some(name) => write!(f, "({}) {}: {}", name, self.code, self.message),
            None => write!(f, "({}) {}", self.code, self.message),
        }
    }
}

/// One failed document within a write or bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteError {
    /// Position of the failing document in the request.
    pub index: usize,
    pub code: i32,
    pub message: String,
}

impl WriteError {
    pub fn new(index: usize, code: i32, message: impl Into<String>) -> Self {
        Self {
            index,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write error at index {}, code {}: {}", self.index, self.code, self.message)
    }
}

/// A write accepted by the primary whose durability requirement was not met.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteConcernError {
    pub code: i32,
    pub code_name: Option<String>,
    pub message: String,
}

impl fmt::Display for WriteConcernError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code_name {
            Some(name) => write!(
                f,
                "WriteConcernError: {}, code: {}, codeName: {}",
                self.message, self.code, name
            ),
            None => write!(f, "WriteConcernError: {}, code: {}", self.message, self.code),
        }
    }
}

/// Transport-level failure reported without a server code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    ConnectionReset,
    EndOfStream,
    UnexpectedEof,
    NoReachableServers,
    ConnectionClosed,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionReset => write!(f, "connection reset"),
            Self::EndOfStream => write!(f, "end of stream"),
            Self::UnexpectedEof => write!(f, "unexpected eof"),
            Self::NoReachableServers => write!(f, "no reachable servers"),
            Self::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

/// Every error shape the destination wrapper can hand back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// A single command error.
    #[error("command failed {0}")]
    Command(CommandError),

    /// A single write error (e.g. from an insert of one document).
    #[error("{0}")]
    Write(WriteError),

    /// A majority write-concern failure lifted from a command reply.
    #[error("{0}")]
    WriteConcern(WriteConcernError),

    /// Composite: per-document write errors plus an optional write-concern error.
    #[error("write exception: {} write error(s), write concern error: {}", .write_errors.len(), .write_concern_error.is_some())]
    WriteException {
        write_errors: Vec<WriteError>,
        write_concern_error: Option<WriteConcernError>,
    },

    /// Composite: bulk write errors plus an optional write-concern error.
    #[error("bulk write exception: {} write error(s), write concern error: {}", .write_errors.len(), .write_concern_error.is_some())]
    BulkWriteException {
        write_errors: Vec<WriteError>,
        write_concern_error: Option<WriteConcernError>,
    },

    /// Socket or connection failure without a server code.
    #[error("transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },

    /// Unstructured error text.
    #[error("{0}")]
    Message(String),
}

impl DbError {
    /// Shorthand for a command error with code and message.
    pub fn command(code: i32, message: impl Into<String>) -> Self {
        Self::Command(CommandError::new(code, message))
    }

    /// Shorthand for a transport error.
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Raw server reply carried by a command error.
    pub fn response(&self) -> Option<&Document> {
        match self {
            Self::Command(e) => e.response.as_ref(),
            _ => None,
        }
    }
}
