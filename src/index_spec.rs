// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index specification rewriting for the destination.
//!
//! Index specs read from an older source are not always accepted verbatim by
//! a newer destination:
//!
//! - `background` is dropped (ignored or rejected by newer servers).
//! - Specs from before 3.4 lack a `v` field; `v: 1` is appended.
//! - Key values other than non-zero numbers and non-empty strings were
//!   treated as `1` before 3.4 and are rejected after; they become `1`.

use bson::{Bson, Document};
use tracing::info;

/// Little-endian encoding of the decimal `0` (exponent 0).
const DECIMAL_ZERO: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x30];

/// Prepare an index spec for `createIndexes` or an applyOps index build.
pub fn fix_outgoing_index_spec(mut index: Document, ns: &str) -> Document {
    index.remove("background");
    if let Ok(key) = index.get_document_mut("key") {
        convert_legacy_index_keys(key, ns);
    }
    append_v1_if_missing(index)
}

/// Append `v: 1` unless the spec already carries a version.
pub fn append_v1_if_missing(mut index: Document) -> Document {
    if !index.contains_key("v") {
        index.insert("v", 1);
    }
    index
}

/// Rewrite legacy key values to `1` in place. Returns true if anything changed.
///
/// Zero numbers, the decimal `0`, empty strings, and non-numeric,
/// non-string values are converted. Decimals equal to zero but encoded
/// differently (`0.00`, `-0`) are left alone.
pub fn convert_legacy_index_keys(key: &mut Document, ns: &str) -> bool {
    let original = key.clone();
    let mut converted = false;
    for (_, value) in key.iter_mut() {
        let legacy = match value {
            Bson::Int32(v) => *v == 0,
            Bson::Int64(v) => *v == 0,
            Bson::Double(v) => *v == 0.0,
            Bson::Decimal128(d) => d.bytes() == DECIMAL_ZERO,
            Bson::String(s) => s.is_empty(),
            _ => true,
        };
        if legacy {
            *value = Bson::Int32(1);
            converted = true;
        }
    }
    if converted {
        info!(
            ns,
            original = %Bson::Document(original).into_relaxed_extjson(),
            converted = %Bson::Document(key.clone()).into_relaxed_extjson(),
            "Converted legacy index key values"
        );
    }
    converted
}

#[derive(Debug, PartialEq)]
enum KeyValue<'a> {
    Number(f64),
    Text(&'a str),
    Other(&'a Bson),
}

fn key_value(value: &Bson) -> KeyValue<'_> {
    match value {
        Bson::Int32(v) => KeyValue::Number(f64::from(*v)),
        Bson::Int64(v) => KeyValue::Number(*v as f64),
        Bson::Double(v) => KeyValue::Number(*v),
        Bson::String(s) => match s.parse::<f64>() {
            Ok(n) => KeyValue::Number(n),
            Err(_) => KeyValue::Text(s),
        },
        other => KeyValue::Other(other),
    }
}

/// Compare two index key patterns field by field, in order.
///
/// Numeric values compare by value regardless of BSON type, and numeric
/// strings compare as numbers (`"1.0"` equals `1`).
pub fn is_index_keys_equal(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && key_value(va) == key_value(vb))
}
