// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Executor tests against a scripted destination.
//!
//! All timing tests run with a paused clock, so retry floors measured in
//! milliseconds resolve instantly and deterministically.
//!
//! # Test Organization
//! - `retry_*` - the retry loop and its floors
//! - `recover_*` - session recovery
//! - `insert_*`, `create_*`, `drop_*` - "already done" handling on retry
//! - `index_*`, `coll_mod_*` - version-dependent index and collMod paths
//! - `apply_ops_*` - batch shape and error reporting

mod common;

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use common::*;
use oplog_mirror::config::ExecutorConfig;
use oplog_mirror::destination::{ApplyOpsResponse, BuildInfo};
use oplog_mirror::error::{DbError, MirrorError};
use oplog_mirror::executor::Executor;
use oplog_mirror::oplog::Namespace;
use oplog_mirror::resilience::RetryPolicy;
use std::sync::{Arc, Mutex};

fn setup() -> (Arc<MockDestination>, Executor<MockDestination>) {
    let mock = Arc::new(MockDestination::new());
    let executor = Executor::new(Arc::clone(&mock), ExecutorConfig::for_testing())
        .expect("testing config is valid");
    (mock, executor)
}

fn build_info(version: &[i32]) -> BuildInfo {
    BuildInfo {
        version: version
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join("."),
        version_array: version.to_vec(),
    }
}

fn documents_len(call: &CommandCall) -> usize {
    call.command.get_array("documents").map_or(0, |docs| docs.len())
}

// =============================================================================
// Retry loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn retry_k_failures_then_success() {
    let (mock, executor) = setup();
    let flags = Mutex::new(Vec::new());

    let result = executor
        .run_retryable("test", |is_retry| {
            let n = {
                let mut flags = flags.lock().unwrap();
                flags.push(is_retry);
                flags.len()
            };
            async move {
                if n <= 2 {
                    Err(not_master())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(*flags.lock().unwrap(), vec![false, true, true]);
    // One recovery probe before each retry.
    assert_eq!(mock.count(PROBE), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_success_first_time_makes_no_probe() {
    let (mock, executor) = setup();
    let result: Result<i32, _> = executor
        .run_retryable("test", |_| async { Ok(7) })
        .await;
    assert_eq!(result.unwrap(), 7);
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retry_terminal_error_is_not_retried() {
    let (mock, executor) = setup();
    let calls = Mutex::new(0);

    let result: Result<(), _> = executor
        .run_retryable("test", |_| {
            *calls.lock().unwrap() += 1;
            async { Err(bad_value()) }
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, MirrorError::Command(DbError::Command(ref e)) if e.code == 2));
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(mock.count(PROBE), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_only_after_both_floors() {
    let (_mock, executor) = setup();
    let policy = RetryPolicy::testing();
    let calls = Mutex::new(0usize);

    let result: Result<(), _> = executor
        .run_retryable("test", |_| {
            *calls.lock().unwrap() += 1;
            async { Err(network_timeout()) }
        })
        .await;

    match result.unwrap_err() {
        MirrorError::RetriesExhausted {
            attempts,
            elapsed,
            source,
        } => {
            assert_eq!(attempts, *calls.lock().unwrap());
            assert!(attempts > policy.min_attempts);
            assert!(elapsed >= policy.min_duration);
            assert_eq!(source, network_timeout());
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn retry_attempt_floor_holds_when_time_floor_is_zero() {
    let mock = Arc::new(MockDestination::new());
    let executor = Executor::new(Arc::clone(&mock), ExecutorConfig::for_testing())
        .unwrap()
        .with_policy(RetryPolicy {
            min_attempts: 4,
            min_reconnect_attempts: 1,
            min_duration: std::time::Duration::ZERO,
            recover_sleep: std::time::Duration::from_millis(1),
        });
    let calls = Mutex::new(0usize);

    let result: Result<(), _> = executor
        .run_retryable("test", |_| {
            *calls.lock().unwrap() += 1;
            async { Err(not_master()) }
        })
        .await;

    assert!(matches!(
        result,
        Err(MirrorError::RetriesExhausted { attempts: 5, .. })
    ));
    assert_eq!(*calls.lock().unwrap(), 5);
    assert_eq!(mock.count(PROBE), 4);
}

#[tokio::test(start_paused = true)]
async fn retry_write_concern_error_is_retried() {
    let (mock, executor) = setup();
    mock.push(
        "drop",
        Ok(doc! {
            "ok": 1.0,
            "writeConcernError": { "code": 64, "errmsg": "waiting for replication timed out" },
        }),
    );

    executor
        .drop_collection(&Namespace::new("app", "users"))
        .await
        .unwrap();
    assert_eq!(mock.keys(), vec!["drop", PROBE, "drop"]);
}

// =============================================================================
// Session recovery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn recover_fails_after_reconnect_floors() {
    let (mock, executor) = setup();
    mock.always("drop", Err(not_master()));
    mock.always(PROBE, Err(network_timeout()));

    let err = executor
        .drop_collection(&Namespace::new("app", "users"))
        .await
        .unwrap_err();

    match err {
        MirrorError::ReconnectFailed {
            target,
            attempts,
            elapsed,
            ..
        } => {
            let policy = RetryPolicy::testing();
            assert_eq!(target, "destination");
            assert!(attempts >= policy.min_reconnect_attempts);
            assert!(elapsed >= policy.min_duration);
            assert_eq!(attempts, mock.count(PROBE));
        }
        other => panic!("expected ReconnectFailed, got {:?}", other),
    }
    assert_eq!(mock.count("drop"), 1);
}

#[tokio::test(start_paused = true)]
async fn recover_stops_on_terminal_probe_error() {
    let (mock, executor) = setup();
    mock.push("drop", Err(not_master()));
    mock.push(PROBE, Err(DbError::command(13, "not authorized on admin")));

    let err = executor
        .drop_collection(&Namespace::new("app", "users"))
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::ReconnectFailed { attempts: 1, .. }));
    assert_eq!(mock.count(PROBE), 1);
}

#[tokio::test(start_paused = true)]
async fn recover_keeps_probing_until_destination_returns() {
    let (mock, executor) = setup();
    mock.push("dropDatabase", Err(not_master()));
    mock.fail_times(PROBE, 3, network_timeout());

    executor.drop_database("app").await.unwrap();
    assert_eq!(
        mock.keys(),
        vec!["dropDatabase", PROBE, PROBE, PROBE, PROBE, "dropDatabase"]
    );
}

#[tokio::test(start_paused = true)]
async fn recover_read_only_uses_is_master() {
    let (mock, executor) = setup();
    mock.push("buildInfo", Err(network_timeout()));
    mock.push(
        "buildInfo",
        Ok(doc! { "ok": 1.0, "version": "4.2.1", "versionArray": [4, 2, 1, 0] }),
    );

    let info = executor.build_info().await.unwrap();
    assert_eq!(info.version, "4.2.1");
    assert_eq!(mock.keys(), vec!["buildInfo", "isMaster", "buildInfo"]);
    assert_eq!(mock.calls_for("isMaster")[0].db, "admin");
}

// =============================================================================
// Derived operations
// =============================================================================

#[tokio::test(start_paused = true)]
async fn insert_duplicate_key_falls_back_to_one_at_a_time() {
    let (mock, executor) = setup();
    let docs: Vec<Document> = (0..5).map(|i| doc! { "_id": i }).collect();
    // Batch hits a duplicate; first single insert is a duplicate too; the
    // second single insert succeeds and the rest go as a batch.
    mock.push("insert", Ok(duplicate_key_reply(0)));
    mock.push("insert", Ok(duplicate_key_reply(0)));

    executor
        .insert_many(&Namespace::new("app", "users"), &docs)
        .await
        .unwrap();

    let inserts = mock.calls_for("insert");
    let sizes: Vec<usize> = inserts.iter().map(documents_len).collect();
    assert_eq!(sizes, vec![5, 1, 1, 3]);
    assert_eq!(
        inserts[3].command.get_array("documents").unwrap()[0],
        Bson::Document(doc! { "_id": 2 })
    );
    for call in &inserts {
        assert_eq!(call.db, "app");
        assert_eq!(
            call.command.get_document("writeConcern").unwrap(),
            &doc! { "w": "majority" }
        );
    }
}

#[tokio::test(start_paused = true)]
async fn insert_other_write_error_surfaces() {
    let (mock, executor) = setup();
    mock.push(
        "insert",
        Ok(doc! {
            "ok": 1.0,
            "writeErrors": [ { "index": 0, "code": 121, "errmsg": "Document failed validation" } ],
        }),
    );

    let err = executor
        .insert_many(&Namespace::new("app", "users"), &[doc! { "_id": 1 }])
        .await
        .unwrap_err();
    assert!(!err.is_duplicate_key());
    assert_eq!(mock.count("insert"), 1);
}

#[tokio::test(start_paused = true)]
async fn create_namespace_exists_on_retry_is_success() {
    let (mock, executor) = setup();
    mock.push("create", Err(not_master()));
    mock.push("create", Ok(error_reply(48, "collection already exists")));

    executor
        .create_collection("app", doc! { "create": "users" })
        .await
        .unwrap();
    assert_eq!(mock.count("create"), 2);
}

#[tokio::test(start_paused = true)]
async fn create_namespace_exists_on_first_attempt_is_error() {
    let (mock, executor) = setup();
    mock.push("create", Ok(error_reply(48, "collection already exists")));

    let err = executor
        .create_collection("app", doc! { "create": "users" })
        .await
        .unwrap_err();
    assert!(err
        .command_error()
        .map_or(false, oplog_mirror::classify::is_namespace_exists));
}

#[tokio::test(start_paused = true)]
async fn drop_namespace_missing_on_retry_is_success() {
    let (mock, executor) = setup();
    mock.push("drop", Err(network_timeout()));
    mock.push("drop", Ok(error_reply(26, "ns not found")));

    executor
        .drop_collection(&Namespace::new("app", "users"))
        .await
        .unwrap();
    let drops = mock.calls_for("drop");
    assert_eq!(drops.len(), 2);
    assert_eq!(drops[0].command.get_str("drop").unwrap(), "users");
}

#[tokio::test(start_paused = true)]
async fn drop_system_js_renames_first() {
    let (mock, executor) = setup();

    executor
        .drop_collection(&Namespace::new("app", "system.js"))
        .await
        .unwrap();

    assert_eq!(mock.keys(), vec!["renameCollection", "drop"]);
    let rename = &mock.calls_for("renameCollection")[0];
    assert_eq!(rename.db, "admin");
    assert_eq!(rename.command.get_str("renameCollection").unwrap(), "app.system.js");
    assert_eq!(
        rename.command.get_str("to").unwrap(),
        "app._oplog_mirror_drop_pending_system.js"
    );
    let drop = &mock.calls_for("drop")[0];
    assert_eq!(drop.db, "app");
    assert_eq!(
        drop.command.get_str("drop").unwrap(),
        "_oplog_mirror_drop_pending_system.js"
    );
}

#[tokio::test(start_paused = true)]
async fn drop_rename_source_missing_on_retry_is_success() {
    let (mock, executor) = setup();
    mock.push("renameCollection", Err(not_master()));
    mock.push("renameCollection", Ok(error_reply(26, "source namespace does not exist")));

    executor
        .rename_and_drop(&Namespace::new("app", "system.js"))
        .await
        .unwrap();
    assert_eq!(mock.count("renameCollection"), 2);
    assert_eq!(mock.count("drop"), 1);
}

// =============================================================================
// Indexes and collMod
// =============================================================================

#[tokio::test(start_paused = true)]
async fn index_specs_are_fixed_and_sent_with_majority() {
    let (mock, executor) = setup();
    let indexes = vec![doc! { "key": { "a": 0 }, "name": "a_0", "background": true }];

    executor
        .create_indexes(&Namespace::new("app", "users"), &indexes, &build_info(&[4, 0, 0]))
        .await
        .unwrap();

    assert_eq!(mock.keys(), vec!["createIndexes"]);
    let cmd = &mock.calls_for("createIndexes")[0].command;
    assert_eq!(cmd.get_str("createIndexes").unwrap(), "users");
    assert_eq!(cmd.get_document("writeConcern").unwrap(), &doc! { "w": "majority" });
    let spec = cmd.get_array("indexes").unwrap()[0].as_document().unwrap();
    assert!(!spec.contains_key("background"));
    assert_eq!(spec.get_i32("v").unwrap(), 1);
    assert_eq!(spec.get_document("key").unwrap(), &doc! { "a": 1 });
}

#[tokio::test(start_paused = true)]
async fn index_build_on_old_destination_waits_for_majority() {
    let (mock, executor) = setup();
    executor
        .create_indexes(
            &Namespace::new("app", "users"),
            &[doc! { "key": { "a": 1 }, "name": "a_1" }],
            &build_info(&[3, 2, 22]),
        )
        .await
        .unwrap();
    assert_eq!(mock.keys(), vec!["createIndexes", PROBE]);
}

#[tokio::test(start_paused = true)]
async fn index_fallback_uses_create_indexes_oplog_command_with_uuid() {
    let (mock, executor) = setup();
    mock.push("createIndexes", Ok(error_reply(197, "invalid index specification option")));
    let uuid = Binary {
        subtype: BinarySubtype::Uuid,
        bytes: vec![3; 16],
    };
    let indexes = vec![
        doc! { "key": { "a": 1 }, "name": "a_1" },
        doc! { "key": { "b": 1 }, "name": "b_1", "v": 2 },
    ];

    executor
        .create_indexes_with_fallback(
            &Namespace::new("app", "users"),
            &indexes,
            &build_info(&[4, 0, 0]),
            Some(&uuid),
        )
        .await
        .unwrap();

    assert_eq!(mock.keys(), vec!["createIndexes", "applyOps", "applyOps"]);
    for (call, name) in mock.calls_for("applyOps").iter().zip(["a_1", "b_1"]) {
        assert!(!call.command.contains_key("bypassDocumentValidation"));
        let entries = apply_ops_entries(call);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.get_str("op").unwrap(), "c");
        assert_eq!(entry.get_str("ns").unwrap(), "app.$cmd");
        assert!(matches!(entry.get("ui"), Some(Bson::Binary(b)) if b.bytes == vec![3; 16]));
        let o = entry.get_document("o").unwrap();
        assert_eq!(o.keys().next().map(String::as_str), Some("createIndexes"));
        assert_eq!(o.get_str("createIndexes").unwrap(), "users");
        assert_eq!(o.get_str("name").unwrap(), name);
    }
}

#[tokio::test(start_paused = true)]
async fn index_fallback_without_uuid_inserts_into_system_indexes() {
    let (mock, executor) = setup();
    mock.push("createIndexes", Ok(error_reply(67, "cannot create index")));

    executor
        .create_indexes_with_fallback(
            &Namespace::new("app", "users"),
            &[doc! { "key": { "a": 1 }, "name": "a_1" }],
            &build_info(&[3, 4, 0]),
            None,
        )
        .await
        .unwrap();

    let entries = apply_ops_entries(&mock.calls_for("applyOps")[0]);
    assert_eq!(entries[0].get_str("op").unwrap(), "i");
    assert_eq!(entries[0].get_str("ns").unwrap(), "app.system.indexes");
    assert!(!entries[0].contains_key("ui"));
    assert_eq!(entries[0].get_document("o").unwrap().get_str("name").unwrap(), "a_1");
}

#[tokio::test(start_paused = true)]
async fn index_other_errors_do_not_fall_back() {
    let (mock, executor) = setup();
    mock.push("createIndexes", Ok(error_reply(85, "index options conflict")));

    let err = executor
        .create_indexes_with_fallback(
            &Namespace::new("app", "users"),
            &[doc! { "key": { "a": 1 }, "name": "a_1" }],
            &build_info(&[4, 0, 0]),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::Command(_)));
    assert_eq!(mock.count("applyOps"), 0);
}

#[tokio::test(start_paused = true)]
async fn coll_mod_on_modern_destination_carries_write_concern() {
    let (mock, executor) = setup();
    executor
        .coll_mod("app", doc! { "collMod": "users", "validator": {} }, &build_info(&[3, 6, 0]))
        .await
        .unwrap();
    assert_eq!(mock.keys(), vec!["collMod"]);
    assert!(mock.calls_for("collMod")[0].command.contains_key("writeConcern"));
}

#[tokio::test(start_paused = true)]
async fn coll_mod_on_old_destination_waits_for_majority() {
    let (mock, executor) = setup();
    executor
        .coll_mod("app", doc! { "collMod": "users" }, &build_info(&[3, 4, 10]))
        .await
        .unwrap();
    assert_eq!(mock.keys(), vec!["collMod", PROBE]);
    assert!(!mock.calls_for("collMod")[0].command.contains_key("writeConcern"));
}

// =============================================================================
// applyOps
// =============================================================================

#[tokio::test(start_paused = true)]
async fn apply_ops_empty_is_rejected_without_a_call() {
    let (mock, executor) = setup();
    let err = executor.apply_ops(&[]).await.unwrap_err();
    assert!(matches!(err, MirrorError::EmptyApplyOps));
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn apply_ops_single_entry_has_no_trailing_noop() {
    let (mock, executor) = setup();
    let entry = doc! { "op": "i", "ns": "app.users", "o": { "_id": 1 } };

    executor.apply_ops(&[entry.clone()]).await.unwrap();

    let call = &mock.calls_for("applyOps")[0];
    assert_eq!(call.db, "admin");
    assert_eq!(apply_ops_entries(call), vec![entry]);
    assert!(call.command.get_bool("bypassDocumentValidation").unwrap());
    assert_eq!(call.command.get_document("writeConcern").unwrap(), &doc! { "w": "majority" });
}

#[tokio::test(start_paused = true)]
async fn apply_ops_batch_gets_trailing_noop_command() {
    let (mock, executor) = setup();
    let entries: Vec<Document> = (0..3)
        .map(|i| doc! { "op": "i", "ns": "app.users", "o": { "_id": i } })
        .collect();

    executor.apply_ops(&entries).await.unwrap();

    let sent = apply_ops_entries(&mock.calls_for("applyOps")[0]);
    assert_eq!(sent.len(), 4);
    assert_eq!(&sent[..3], &entries[..]);
    let dummy = &sent[3];
    assert_eq!(dummy.get_str("op").unwrap(), "c");
    assert_eq!(dummy.get_str("ns").unwrap(), "noop.$cmd");
    let inner = dummy.get_document("o").unwrap().get_array("applyOps").unwrap();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].as_document().unwrap().get_str("op").unwrap(), "n");
}

#[tokio::test(start_paused = true)]
async fn apply_ops_without_bypass_when_disabled() {
    let mock = Arc::new(MockDestination::new());
    let config = ExecutorConfig {
        bypass_document_validation: false,
        ..ExecutorConfig::for_testing()
    };
    let executor = Executor::new(Arc::clone(&mock), config).unwrap();

    executor
        .apply_ops(&[doc! { "op": "d", "ns": "app.users", "o": { "_id": 1 } }])
        .await
        .unwrap();
    assert!(!mock.calls_for("applyOps")[0]
        .command
        .contains_key("bypassDocumentValidation"));
}

#[tokio::test(start_paused = true)]
async fn apply_ops_failure_exposes_per_entry_results() {
    let (mock, executor) = setup();
    mock.push(
        "applyOps",
        Ok(doc! {
            "ok": 0.0,
            "code": 11000,
            "errmsg": "E11000 duplicate key error",
            "applied": 2,
            "results": [true, false],
        }),
    );
    let entries: Vec<Document> = (0..2)
        .map(|i| doc! { "op": "i", "ns": "app.users", "o": { "_id": i } })
        .collect();

    let err = executor.apply_ops(&entries).await.unwrap_err();
    let response = ApplyOpsResponse::from_error(&err).expect("reply kept on the error");
    assert_eq!(response.failed_index(), Some(1));
    assert_eq!(response.code, Some(11000));
    assert_eq!(mock.count("applyOps"), 1);
}

#[tokio::test(start_paused = true)]
async fn apply_ops_boolean_ok_decodes_results() {
    let (mock, executor) = setup();
    mock.push("applyOps", Ok(doc! { "ok": true, "applied": 1, "results": [true] }));

    let response = executor
        .apply_ops(&[doc! { "op": "i", "ns": "app.users", "o": { "_id": 1 } }])
        .await
        .unwrap();
    assert!(response.is_ok());
    assert_eq!(response.applied, Some(1));
    assert_eq!(response.results, vec![true]);
    assert_eq!(response.failed_index(), None);
}

#[tokio::test(start_paused = true)]
async fn apply_ops_malformed_reply_is_an_error() {
    let (mock, executor) = setup();
    mock.push("applyOps", Ok(doc! { "ok": 1, "results": "all of them" }));

    let err = executor
        .apply_ops(&[doc! { "op": "i", "ns": "app.users", "o": { "_id": 1 } }])
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::Command(DbError::Message(ref m)) if m.contains("applyOps")));
    assert_eq!(mock.count("applyOps"), 1);
    assert_eq!(mock.count(PROBE), 0);
}

#[tokio::test(start_paused = true)]
async fn apply_ops_retries_after_election() {
    let (mock, executor) = setup();
    mock.push("applyOps", Err(DbError::command(11602, "InterruptedDueToReplStateChange")));

    let response = executor
        .apply_ops(&[doc! { "op": "i", "ns": "app.users", "o": { "_id": 1 } }])
        .await
        .unwrap();
    assert!(response.is_ok());
    assert_eq!(mock.keys(), vec!["applyOps", PROBE, "applyOps"]);
}

// =============================================================================
// Reads and misc
// =============================================================================

#[tokio::test(start_paused = true)]
async fn collection_info_reads_first_batch() {
    let (mock, executor) = setup();
    mock.push(
        "listCollections",
        Ok(doc! {
            "ok": 1.0,
            "cursor": {
                "id": 0_i64,
                "ns": "app.$cmd.listCollections",
                "firstBatch": [
                    { "name": "users", "type": "collection", "options": {}, "info": { "readOnly": false } },
                ],
            },
        }),
    );
    mock.push(
        "listCollections",
        Ok(doc! { "ok": 1.0, "cursor": { "id": 0_i64, "firstBatch": [] } }),
    );

    let ns = Namespace::new("app", "users");
    let info = executor.collection_info(&ns).await.unwrap().unwrap();
    assert_eq!(info.name, "users");
    assert!(info.uuid.is_none());
    assert!(executor.collection_info(&ns).await.unwrap().is_none());

    let cmd = &mock.calls_for("listCollections")[0].command;
    assert_eq!(cmd.get_document("filter").unwrap(), &doc! { "name": "users" });
}

#[tokio::test(start_paused = true)]
async fn wait_for_majority_is_a_single_noop() {
    let (mock, executor) = setup();
    executor.wait_for_write_concern_majority().await.unwrap();
    let probe = &mock.calls_for(PROBE)[0];
    assert!(probe.command.get_bool("bypassDocumentValidation").unwrap());
    let noop = &apply_ops_entries(probe)[0];
    assert_eq!(
        noop.get_document("o").unwrap().get_str("msg").unwrap(),
        "oplog-mirror noop"
    );
}

#[test]
fn invalid_config_is_rejected() {
    let config = ExecutorConfig {
        recover_sleep: "soon".to_string(),
        ..ExecutorConfig::for_testing()
    };
    let result = Executor::new(Arc::new(MockDestination::new()), config);
    assert!(matches!(result, Err(MirrorError::Config(_))));
}
