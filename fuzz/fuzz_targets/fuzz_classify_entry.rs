//! Fuzz target for oplog entry classification.
//!
//! Arbitrary bytes that decode as a BSON document must classify without
//! panicking, and a final entry is never both a commit and an abort.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oplog_mirror::txn::{Buffer, Meta};
use oplog_mirror::Oplog;

fuzz_target!(|data: &[u8]| {
    let doc = match bson::Document::from_reader(data) {
        Ok(doc) => doc,
        Err(_) => return,
    };
    let op = match Oplog::from_document(&doc) {
        Ok(op) => op,
        Err(_) => return,
    };
    let meta = match Meta::from_oplog(&op) {
        Ok(meta) => meta,
        Err(_) => return,
    };

    assert!(!(meta.is_commit() && meta.is_abort()));
    if !meta.is_txn() {
        assert!(meta.id().is_zero());
        return;
    }

    // A committed single entry must stream without panicking.
    let buffer = Buffer::new();
    if buffer.add_op(&meta, op).is_ok() && meta.is_commit() {
        if let Ok(stream) = buffer.stream(&meta) {
            let _ = stream.drain();
        }
    }
    let _ = buffer.purge(&meta);
    assert!(buffer.is_empty());
});
