// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transaction reconstruction.
//!
//! A transaction larger than one document is written to the oplog as a chain
//! of `applyOps` entries linked by `prevOpTime`, optionally closed by a
//! separate `commitTransaction`/`abortTransaction` entry. [`Meta`] classifies
//! each entry; [`Buffer`] collects chains until their final entry arrives.
//!
//! ```text
//! entry ──► Meta::from_oplog ──► Buffer::add_op ──► (final?) ──► Buffer::stream ──► apply
//!                                                                       │
//!                                                           Buffer::purge ◄┘
//! ```

mod buffer;
mod meta;

pub use buffer::{Buffer, TxnStream};
pub use meta::{Meta, TxnId, TxnRole};
