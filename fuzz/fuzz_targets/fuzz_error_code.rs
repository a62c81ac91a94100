//! Fuzz target for destination reply lifting and error classification.
//!
//! Any decodable reply must lift and classify without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oplog_mirror::classify::{classify, error_code, is_connection_error, is_reconnectable};
use oplog_mirror::executor::check_reply;

fuzz_target!(|data: &[u8]| {
    let reply = match bson::Document::from_reader(data) {
        Ok(doc) => doc,
        Err(_) => return,
    };
    if let Err(err) = check_reply(reply) {
        let _ = error_code(&err);
        let _ = classify(&err);
        let _ = is_connection_error(&err);
        let _ = is_reconnectable(&err);
    }
});
