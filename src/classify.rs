// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error classification for destination failures.
//!
//! Every higher layer asks this module what a [`DbError`] *means* instead of
//! poking at codes and messages itself. Classification happens in two steps:
//!
//! 1. [`error_code()`] pulls the first numeric server code out of whatever
//!    shape the error has, recursing into composite write/bulk exceptions
//!    (write errors first, then the write-concern error). `0` means no code.
//! 2. Predicates map that code (plus labels, transport kind, or message text
//!    when there is no code) onto a semantic category.
//!
//! # Reconnectable Codes
//!
//! | Code | Name |
//! |------|------|
//! | 10107 | NotMaster |
//! | 13435 | NotMasterNoSlaveOk |
//! | 13436 | NotMasterOrSecondary |
//! | 64 | WriteConcernFailed |
//! | 6 | HostUnreachable |
//! | 7 | HostNotFound |
//! | 89 | NetworkTimeout |
//! | 9001 | SocketException |
//! | 91 | ShutdownInProgress |
//! | 189 | PrimarySteppedDown |
//! | 11600 | InterruptedAtShutdown |
//! | 11601 | Interrupted |
//! | 11602 | InterruptedDueToReplStateChange |
//! | 136 | CappedPositionLost |
//! | 175 | QueryPlanKilled |

use crate::error::{DbError, TransportKind};

/// Codes observed when a primary steps down, shuts down, or the network drops.
pub const RECONNECTABLE_CODES: &[i32] = &[
    10107, 13435, 13436, 64, 6, 7, 89, 9001, 91, 189, 11600, 11601, 11602, 136,
];

/// Plan executor killed by a replication state change (3.6.0-3.6.3 servers).
const QUERY_PLAN_KILLED: i32 = 175;

const DUPLICATE_KEY_CODES: &[i32] = &[11000, 11001, 12582];

const NAMESPACE_NOT_FOUND: i32 = 26;
const NAMESPACE_EXISTS: i32 = 48;
const CANNOT_CREATE_INDEX: i32 = 67;
const INVALID_INDEX_SPECIFICATION_OPTION: i32 = 197;
const UNAUTHORIZED: i32 = 13;
const USER_NOT_FOUND: i32 = 11;
const CURSOR_NOT_FOUND: i32 = 43;
const INVALID_OPTIONS: i32 = 72;
const COMMAND_NOT_SUPPORTED_ON_VIEW: i32 = 166;

/// Semantic category of a destination error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient: reconnect and retry.
    Reconnectable,
    DuplicateKey,
    NamespaceExists,
    NamespaceMissing,
    InvalidIndexOption,
    CannotCreateIndex,
    /// Anything else: surfaced to the caller as-is.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconnectable => write!(f, "reconnectable"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::NamespaceExists => write!(f, "namespace_exists"),
            Self::NamespaceMissing => write!(f, "namespace_missing"),
            Self::InvalidIndexOption => write!(f, "invalid_index_option"),
            Self::CannotCreateIndex => write!(f, "cannot_create_index"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Map an error onto its semantic category.
///
/// Reconnectable wins over everything else since a retry will re-evaluate
/// the rest.
pub fn classify(err: &DbError) -> ErrorKind {
    if is_reconnectable(err) {
        ErrorKind::Reconnectable
    } else if is_duplicate_key(err) {
        ErrorKind::DuplicateKey
    } else if is_namespace_exists(err) {
        ErrorKind::NamespaceExists
    } else if is_namespace_missing(err) {
        ErrorKind::NamespaceMissing
    } else if is_invalid_index_option(err) {
        ErrorKind::InvalidIndexOption
    } else if is_cannot_create_index(err) {
        ErrorKind::CannotCreateIndex
    } else {
        ErrorKind::Other
    }
}

/// Extract the first server code from any error shape (0 = unclassified).
pub fn error_code(err: &DbError) -> i32 {
    match err {
        DbError::Command(e) => e.code,
        DbError::Write(e) => e.code,
        DbError::WriteConcern(e) => e.code,
        DbError::WriteException {
            write_errors,
            write_concern_error,
        }
        | DbError::BulkWriteException {
            write_errors,
            write_concern_error,
        } => {
            if let Some(first) = write_errors.first() {
                return first.code;
            }
            write_concern_error.as_ref().map_or(0, |wce| wce.code)
        }
        DbError::Transport { .. } | DbError::Message(_) => 0,
    }
}

/// Check if we can reconnect to the cluster and retry.
pub fn is_reconnectable(err: &DbError) -> bool {
    // All w:majority write concern errors are retryable.
    if matches!(err, DbError::WriteConcern(_)) {
        return true;
    }

    let code = error_code(err);
    if RECONNECTABLE_CODES.contains(&code) || code == QUERY_PLAN_KILLED {
        return true;
    }
    // The server may send "not master" without an error code.
    if code == 0 && err.to_string().contains("not master") {
        return true;
    }

    is_network_error(err)
}

/// Check for socket-level failures: timeouts, resets, closed streams.
pub fn is_network_error(err: &DbError) -> bool {
    match err {
        DbError::Transport { .. } => true,
        DbError::Command(e) => e.has_label("NetworkError"),
        DbError::Message(msg) => {
            msg == "no reachable servers" || msg == "Closed explicitly" || msg == "connection closed"
        }
        _ => false,
    }
}

/// Check if the error (or any write error within it) is a duplicate key.
pub fn is_duplicate_key(err: &DbError) -> bool {
    match err {
        DbError::Command(e) => DUPLICATE_KEY_CODES.contains(&e.code),
        DbError::Write(e) => DUPLICATE_KEY_CODES.contains(&e.code),
        DbError::WriteException { write_errors, .. }
        | DbError::BulkWriteException { write_errors, .. } => write_errors
            .iter()
            .any(|we| DUPLICATE_KEY_CODES.contains(&we.code)),
        _ => false,
    }
}

fn command_code(err: &DbError) -> Option<i32> {
    match err {
        DbError::Command(e) => Some(e.code),
        _ => None,
    }
}

/// `NamespaceExists` (48).
pub fn is_namespace_exists(err: &DbError) -> bool {
    command_code(err) == Some(NAMESPACE_EXISTS)
}

/// `NamespaceNotFound` (26).
pub fn is_namespace_missing(err: &DbError) -> bool {
    command_code(err) == Some(NAMESPACE_NOT_FOUND)
}

/// `InvalidIndexSpecificationOption` (197).
pub fn is_invalid_index_option(err: &DbError) -> bool {
    command_code(err) == Some(INVALID_INDEX_SPECIFICATION_OPTION)
}

/// `CannotCreateIndex` (67).
pub fn is_cannot_create_index(err: &DbError) -> bool {
    command_code(err) == Some(CANNOT_CREATE_INDEX)
}

/// `Unauthorized` (13).
pub fn is_unauthorized(err: &DbError) -> bool {
    command_code(err) == Some(UNAUTHORIZED)
}

/// `UserNotFound` (11).
pub fn is_user_not_found(err: &DbError) -> bool {
    command_code(err) == Some(USER_NOT_FOUND)
}

/// `CommandNotSupportedOnView` (166).
pub fn is_view_error(err: &DbError) -> bool {
    command_code(err) == Some(COMMAND_NOT_SUPPORTED_ON_VIEW)
}

/// `InvalidOptions` (72).
pub fn is_invalid_options(err: &DbError) -> bool {
    command_code(err) == Some(INVALID_OPTIONS)
}

/// `CommandNotFound` (59), the legacy 13390 code, or "no such cmd".
pub fn is_command_not_found(err: &DbError) -> bool {
    match err {
        DbError::Command(e) => {
            e.code == 59 || e.code == 13390 || e.message.contains("no such cmd")
        }
        _ => false,
    }
}

/// `CursorNotFound` (43) or a message saying so.
pub fn is_cursor_not_found(err: &DbError) -> bool {
    error_code(err) == CURSOR_NOT_FOUND || err.to_string().contains("cursor not found")
}

/// Planner rejected a hint: 17007 on old servers, 2 + "bad hint" on newer.
pub fn is_bad_hint(err: &DbError) -> bool {
    match err {
        DbError::Command(e) => {
            e.code == 17007 || (e.code == 2 && e.message.contains("bad hint"))
        }
        _ => false,
    }
}

/// Phrases drivers use for lost connections when they report no code.
const CONNECTION_PHRASES: &[&str] = &[
    "waiting for replication timed out",
    "could not contact primary for replica set",
    "write results unavailable from",
    "could not find host matching read preference { mode: \"primary\"",
    "unable to target",
];

/// Classify an unstructured error message as a lost connection
/// (as opposed to a write failure such as a duplicate key).
pub fn is_connection_error(err: &DbError) -> bool {
    if matches!(
        err,
        DbError::Transport {
            kind: TransportKind::EndOfStream,
            ..
        }
    ) {
        return true;
    }
    let lower = err.to_string().to_lowercase();
    lower == "no reachable servers"
        || lower == "not master"
        || CONNECTION_PHRASES.iter().any(|p| lower.contains(p))
        || lower.ends_with("connection refused")
}
