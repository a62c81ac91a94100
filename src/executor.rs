// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retryable execution of destination commands.
//!
//! Every command that mutates the destination goes through
//! [`Executor::run_retryable`]. A reconnectable failure leaves the outcome of
//! the attempt unknown, so before retrying the executor recovers the session
//! with a majority no-op write. A retry therefore observes everything the
//! failed attempt managed to commit, and the derived operations below decide
//! how to read "already done" errors on a retry.
//!
//! # Retry Loop
//!
//! ```text
//! attempt(false) ──ok──► done
//!      │ err
//!      ▼
//! ┌─► reconnectable? ──no──► MirrorError::Command
//! │        │ yes
//! │   floors exhausted? ──yes──► MirrorError::RetriesExhausted
//! │        │ no
//! │   recover_session ──fail──► MirrorError::ReconnectFailed
//! │        │
//! │   attempt(true) ──ok──► done
//! └────────┘ err
//! ```
//!
//! # Derived Operations
//!
//! | Operation | On retry |
//! |-----------|----------|
//! | `insert_many` | duplicate key ⇒ one-at-a-time until first success |
//! | `create_collection` | namespace exists ⇒ success |
//! | `drop_collection` / `rename_and_drop` | namespace missing ⇒ success |
//! | `create_indexes_with_fallback` | bad option ⇒ per-index applyOps |
//! | `apply_ops` | non-atomic batch with trailing no-op |

use crate::classify::{
    is_cannot_create_index, is_invalid_index_option, is_namespace_exists, is_namespace_missing,
    is_network_error, is_reconnectable,
};
use crate::config::ExecutorConfig;
use crate::destination::{bson_to_i32, ApplyOpsResponse, BuildInfo, CollectionInfo, CommandRunner};
use crate::error::{CommandError, DbError, DbResult, MirrorError, Result, WriteConcernError, WriteError};
use crate::index_spec::fix_outgoing_index_spec;
use crate::metrics;
use crate::oplog::{Namespace, Oplog};
use crate::resilience::RetryPolicy;
use bson::{doc, Binary, Bson, Document};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Return `cmd` with `writeConcern: {w: "majority"}` appended.
pub fn with_w_majority(mut cmd: Document) -> Document {
    cmd.insert("writeConcern", doc! { "w": "majority" });
    cmd
}

fn command_name(cmd: &Document) -> String {
    cmd.keys().next().cloned().unwrap_or_default()
}

fn reply_i32(reply: &Document, key: &str) -> i32 {
    reply.get(key).and_then(bson_to_i32).unwrap_or(0)
}

fn reply_ok(reply: &Document) -> bool {
    match reply.get("ok") {
        Some(Bson::Double(v)) => *v == 1.0,
        Some(Bson::Int32(v)) => *v == 1,
        Some(Bson::Int64(v)) => *v == 1,
        Some(Bson::Boolean(v)) => *v,
        _ => false,
    }
}

/// Lift a raw reply into an error if it reports one.
///
/// Order: `ok: 0`, then `writeErrors` (with any write-concern error attached),
/// then a lone `writeConcernError`.
pub fn check_reply(reply: Document) -> DbResult<Document> {
    if !reply_ok(&reply) {
        let mut err = CommandError::new(
            reply_i32(&reply, "code"),
            reply.get_str("errmsg").unwrap_or_default(),
        );
        err.code_name = reply.get_str("codeName").ok().map(str::to_string);
        if let Ok(labels) = reply.get_array("errorLabels") {
            err.labels = labels
                .iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect();
        }
        return Err(DbError::Command(err.with_response(reply)));
    }

    let write_concern_error = reply
        .get_document("writeConcernError")
        .ok()
        .map(|wce| WriteConcernError {
            code: reply_i32(wce, "code"),
            code_name: wce.get_str("codeName").ok().map(str::to_string),
            message: wce.get_str("errmsg").unwrap_or_default().to_string(),
        });

    if let Ok(write_errors) = reply.get_array("writeErrors") {
        if !write_errors.is_empty() {
            let write_errors = write_errors
                .iter()
                .filter_map(Bson::as_document)
                .map(|we| {
                    WriteError::new(
                        usize::try_from(reply_i32(we, "index")).unwrap_or(0),
                        reply_i32(we, "code"),
                        we.get_str("errmsg").unwrap_or_default(),
                    )
                })
                .collect();
            return Err(DbError::WriteException {
                write_errors,
                write_concern_error,
            });
        }
    }

    match write_concern_error {
        Some(wce) => Err(DbError::WriteConcern(wce)),
        None => Ok(reply),
    }
}

/// Runs destination commands with reconnect-and-retry semantics.
pub struct Executor<C: CommandRunner> {
    runner: Arc<C>,
    policy: RetryPolicy,
    config: ExecutorConfig,
    /// Encoded `{op: "n", ns: "", o: {msg}}`.
    noop: Document,
}

impl<C: CommandRunner> Executor<C> {
    /// Create an executor. Fails if the config does not validate.
    pub fn new(runner: Arc<C>, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let noop = Oplog::noop(config.noop_message.clone()).to_document()?;
        Ok(Self {
            runner,
            policy: config.retry_policy(),
            config,
            noop,
        })
    }

    /// Override the retry floors derived from the config.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn runner(&self) -> &Arc<C> {
        &self.runner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Retry core
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `attempt`, recovering the destination session and retrying after
    /// reconnectable errors.
    ///
    /// `attempt` receives `false` on the first call and `true` on every retry.
    pub async fn run_retryable<T, F, Fut>(&self, operation: &str, attempt: F) -> Result<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        self.retry_loop(operation, true, attempt).await
    }

    /// Like [`Self::run_retryable`] for commands that only read: recovery
    /// probes with `isMaster` instead of a majority write.
    pub async fn run_retryable_read<T, F, Fut>(&self, operation: &str, attempt: F) -> Result<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        self.retry_loop(operation, false, attempt).await
    }

    async fn retry_loop<T, F, Fut>(&self, operation: &str, writeable: bool, mut attempt: F) -> Result<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut err = match attempt(false).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let start = Instant::now();
        let mut retries = 0usize;
        loop {
            if !is_reconnectable(&err) {
                info!(operation, error = %err, "Error on {}", self.config.destination_name);
                return Err(MirrorError::Command(err));
            }
            if self.policy.command_floors_exhausted(retries, start.elapsed()) {
                break;
            }

            warn!(
                operation,
                attempt = retries + 1,
                error = %err,
                "Reconnecting to the {} after transient error",
                self.config.destination_name
            );
            let kind = if is_network_error(&err) { "network" } else { "server" };
            metrics::record_retry(operation, kind);
            self.recover_session(start, writeable).await?;

            retries += 1;
            match attempt(true).await {
                Ok(value) => {
                    debug!(operation, retries, "Retry succeeded");
                    return Ok(value);
                }
                Err(e) => err = e,
            }
        }

        let elapsed = start.elapsed();
        error!(
            operation,
            attempts = retries + 1,
            elapsed = ?elapsed,
            error = %err,
            "Gave up retrying"
        );
        metrics::record_retries_exhausted(operation, elapsed);
        Err(MirrorError::RetriesExhausted {
            attempts: retries + 1,
            elapsed,
            source: err,
        })
    }

    /// Wait for the destination to accept commands again.
    ///
    /// Sleeps, then probes: a majority no-op applyOps when `writeable`, else
    /// `isMaster`. Probing continues while errors stay reconnectable and the
    /// floors (measured from `start`) are not exhausted.
    pub async fn recover_session(&self, start: Instant, writeable: bool) -> Result<()> {
        let mut attempts = 0usize;
        loop {
            sleep(self.policy.recover_sleep).await;
            attempts += 1;

            let probe = if writeable {
                self.wait_majority_once().await
            } else {
                self.run_command_with_log("admin", doc! { "isMaster": 1 })
                    .await
                    .map(|_| ())
            };

            let err = match probe {
                Ok(()) => {
                    metrics::record_reconnect_attempt(true);
                    info!(attempts, "Reconnected to the {}", self.config.destination_name);
                    return Ok(());
                }
                Err(e) => e,
            };
            metrics::record_reconnect_attempt(false);

            if !is_reconnectable(&err) {
                error!(attempt = attempts, error = %err, "Reconnection attempt failed with unrecoverable error");
            } else if !self.policy.reconnect_floors_exhausted(attempts, start.elapsed()) {
                warn!(attempt = attempts, error = %err, "Reconnection attempt failed");
                continue;
            }

            return Err(MirrorError::ReconnectFailed {
                target: self.config.destination_name.clone(),
                attempts,
                elapsed: start.elapsed(),
                source: err,
            });
        }
    }

    /// Run one command, lifting error replies, with timing logs.
    pub async fn run_command_with_log(&self, db: &str, cmd: Document) -> DbResult<Document> {
        let name = command_name(&cmd);
        debug!(command = %name, db, "Running command");
        let start = Instant::now();
        let result = match self.runner.run_command(db, cmd).await {
            Ok(reply) => check_reply(reply),
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => {
                debug!(command = %name, db, elapsed = ?start.elapsed(), "Command finished");
            }
            Err(e) => {
                info!(command = %name, db, elapsed = ?start.elapsed(), error = %e, "Command finished with error");
            }
        }
        metrics::record_command(&name, result.is_ok());
        result
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // applyOps
    // ═══════════════════════════════════════════════════════════════════════════

    fn dummy_command(&self) -> Document {
        doc! {
            "op": "c",
            "ns": "noop.$cmd",
            "o": { "applyOps": [ self.noop.clone() ] },
        }
    }

    /// One applyOps command with majority write concern. `entries` must be non-empty.
    async fn apply_ops_batch(&self, entries: &[Document], bypass_validation: bool) -> DbResult<ApplyOpsResponse> {
        let mut ops: Vec<Bson> = entries.iter().cloned().map(Bson::Document).collect();
        if ops.len() > 1 {
            // Force the batch to apply non-atomically.
            ops.push(Bson::Document(self.dummy_command()));
        }
        let mut cmd = doc! { "applyOps": ops };
        if bypass_validation {
            cmd.insert("bypassDocumentValidation", true);
        }
        let reply = self.run_command_with_log("admin", with_w_majority(cmd)).await?;
        ApplyOpsResponse::from_reply(&reply)
    }

    async fn wait_majority_once(&self) -> DbResult<()> {
        self.apply_ops_batch(std::slice::from_ref(&self.noop), true)
            .await
            .map(|_| ())
    }

    /// Write a majority no-op so earlier writes are majority committed.
    pub async fn wait_for_write_concern_majority(&self) -> Result<()> {
        self.run_retryable("waitForWriteConcernMajority", |_| self.wait_majority_once())
            .await
    }

    /// Apply a batch of oplog entries, retrying after transient errors.
    ///
    /// Uses the configured `bypassDocumentValidation` toggle.
    pub async fn apply_ops(&self, entries: &[Document]) -> Result<ApplyOpsResponse> {
        self.apply_ops_with(entries, self.config.bypass_document_validation)
            .await
    }

    async fn apply_ops_with(&self, entries: &[Document], bypass_validation: bool) -> Result<ApplyOpsResponse> {
        if entries.is_empty() {
            return Err(MirrorError::EmptyApplyOps);
        }
        self.run_retryable("applyOps", |is_retry| async move {
            let retry = if is_retry { "retry " } else { "" };
            let start = Instant::now();
            let result = self.apply_ops_batch(entries, bypass_validation).await;
            let elapsed = start.elapsed();
            metrics::record_apply_ops_batch(entries.len(), result.is_ok(), elapsed);
            match &result {
                Ok(_) => {
                    debug!(ops = entries.len(), elapsed = ?elapsed, "applyOps {}succeeded", retry);
                }
                Err(e) => {
                    let detail = e
                        .response()
                        .and_then(|reply| ApplyOpsResponse::from_reply(reply).ok())
                        .and_then(|resp| serde_json::to_string(&resp).ok())
                        .unwrap_or_else(|| e.to_string());
                    info!(ops = entries.len(), elapsed = ?elapsed, error = %detail, "applyOps {}failed", retry);
                }
            }
            result
        })
        .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Data and collection commands
    // ═══════════════════════════════════════════════════════════════════════════

    async fn insert_once(&self, ns: &Namespace, docs: &[Document]) -> DbResult<()> {
        let mut cmd = doc! {
            "insert": ns.coll.as_str(),
            "documents": docs.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
            "ordered": true,
        };
        if self.config.bypass_document_validation {
            cmd.insert("bypassDocumentValidation", true);
        }
        self.run_command_with_log(&ns.db, with_w_majority(cmd))
            .await
            .map(|_| ())
    }

    /// Insert documents, tolerating duplicates left behind by a failed attempt.
    ///
    /// After a duplicate-key failure the remaining documents are inserted one
    /// at a time until one succeeds, then batch insertion resumes from the
    /// document after it.
    #[instrument(skip_all, fields(ns = %ns, docs = docs.len()))]
    pub async fn insert_many(&self, ns: &Namespace, docs: &[Document]) -> Result<()> {
        let mut remaining = docs;
        while !remaining.is_empty() {
            let batch = remaining;
            let err = match self.run_retryable("insert", |_| self.insert_once(ns, batch)).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_duplicate_key() => e,
                Err(e) => return Err(e),
            };
            debug!(error = %err, remaining = remaining.len(), "Duplicate key on batch insert, inserting one at a time");

            let mut i = 0;
            while i < remaining.len() {
                let one = std::slice::from_ref(&remaining[i]);
                let result = self.run_retryable("insert", |_| self.insert_once(ns, one)).await;
                i += 1;
                match result {
                    Ok(()) => break,
                    Err(e) if e.is_duplicate_key() => continue,
                    Err(e) => return Err(e),
                }
            }
            metrics::record_duplicate_key_fallback(i);
            remaining = &remaining[i..];
        }
        Ok(())
    }

    /// Run a `create` command. An existing namespace on a retry is success.
    pub async fn create_collection(&self, db: &str, create_cmd: Document) -> Result<()> {
        let create_cmd = &create_cmd;
        self.run_retryable("create", |is_retry| async move {
            match self
                .run_command_with_log(db, with_w_majority(create_cmd.clone()))
                .await
            {
                Err(e) if is_retry && is_namespace_exists(&e) => Ok(()),
                other => other.map(|_| ()),
            }
        })
        .await
    }

    /// Rename the collection to a drop-pending name, then drop that.
    pub async fn rename_and_drop(&self, ns: &Namespace) -> Result<()> {
        let pending = Namespace::new(
            ns.db.clone(),
            format!("{}{}", self.config.drop_pending_prefix, ns.coll),
        );
        let cmd = doc! {
            "renameCollection": ns.to_string(),
            "to": pending.to_string(),
        };
        let cmd = &cmd;
        self.run_retryable("renameCollection", |is_retry| async move {
            match self
                .run_command_with_log("admin", with_w_majority(cmd.clone()))
                .await
            {
                Err(e) if is_retry && is_namespace_missing(&e) => Ok(()),
                other => other.map(|_| ()),
            }
        })
        .await?;
        self.drop_plain(&pending).await
    }

    /// Drop a collection. A missing namespace on a retry is success.
    ///
    /// `system.js` cannot be dropped directly and goes through
    /// [`Self::rename_and_drop`].
    pub async fn drop_collection(&self, ns: &Namespace) -> Result<()> {
        if ns.is_system_js() {
            return self.rename_and_drop(ns).await;
        }
        self.drop_plain(ns).await
    }

    async fn drop_plain(&self, ns: &Namespace) -> Result<()> {
        self.run_retryable("drop", |is_retry| async move {
            match self
                .run_command_with_log(&ns.db, with_w_majority(doc! { "drop": ns.coll.as_str() }))
                .await
            {
                Err(e) if is_retry && is_namespace_missing(&e) => Ok(()),
                other => other.map(|_| ()),
            }
        })
        .await
    }

    pub async fn drop_database(&self, db: &str) -> Result<()> {
        self.run_retryable("dropDatabase", |_| async move {
            self.run_command_with_log(db, with_w_majority(doc! { "dropDatabase": 1 }))
                .await
                .map(|_| ())
        })
        .await
    }

    /// Run `collMod`. Destinations older than 3.6 don't take a write concern
    /// on it, so those wait for a majority no-op instead.
    pub async fn coll_mod(&self, db: &str, coll_mod_cmd: Document, dest: &BuildInfo) -> Result<()> {
        let cmd = &coll_mod_cmd;
        self.run_retryable("collMod", |_| async move {
            if dest.version_at_least(&[3, 6, 0]) {
                return self
                    .run_command_with_log(db, with_w_majority(cmd.clone()))
                    .await
                    .map(|_| ());
            }
            self.run_command_with_log(db, cmd.clone()).await?;
            self.wait_majority_once().await
        })
        .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Indexes
    // ═══════════════════════════════════════════════════════════════════════════

    /// Build all `indexes` on the collection in one `createIndexes` command.
    ///
    /// Destinations older than 3.3.5 ignore the write concern on
    /// `createIndexes`; for those a majority no-op waits for the builds on
    /// secondaries.
    pub async fn create_indexes(&self, ns: &Namespace, indexes: &[Document], dest: &BuildInfo) -> Result<()> {
        let ns_str = ns.to_string();
        let indexes: Vec<Bson> = indexes
            .iter()
            .map(|index| Bson::Document(fix_outgoing_index_spec(index.clone(), &ns_str)))
            .collect();
        let cmd = doc! { "createIndexes": ns.coll.as_str(), "indexes": indexes };
        let cmd = &cmd;
        let ns_str = ns_str.as_str();

        self.run_retryable("createIndexes", |_| async move {
            debug!(ns = ns_str, "Running createIndexes");
            let start = Instant::now();
            if let Err(e) = self
                .run_command_with_log(&ns.db, with_w_majority(cmd.clone()))
                .await
            {
                info!(ns = ns_str, elapsed = ?start.elapsed(), error = %e, "createIndexes finished with error");
                return Err(e);
            }
            info!(ns = ns_str, elapsed = ?start.elapsed(), "createIndexes finished");

            if !dest.version_at_least(&[3, 3, 5]) {
                info!(ns = ns_str, "Waiting for index builds on a majority of nodes to complete");
                self.wait_majority_once().await?;
            }
            Ok(())
        })
        .await
    }

    /// Build one index through applyOps.
    ///
    /// With a collection UUID this is a `createIndexes` command entry;
    /// without one it is an insert into `<db>.system.indexes`.
    pub async fn apply_ops_create_index(
        &self,
        ns: &Namespace,
        index: &Document,
        uuid: Option<&Binary>,
    ) -> Result<ApplyOpsResponse> {
        let index = fix_outgoing_index_spec(index.clone(), &ns.to_string());
        let mut entry = Oplog::noop("");
        match uuid {
            Some(uuid) => {
                info!(ns = %ns, "Running createIndexes with applyOps");
                let mut o = doc! { "createIndexes": ns.coll.as_str() };
                o.extend(index);
                entry.op = "c".to_string();
                entry.ns = Namespace::command(ns.db.clone()).to_string();
                entry.ui = Some(uuid.clone());
                entry.o = o;
            }
            None => {
                info!(ns = %ns, "Running system.indexes applyOps");
                entry.op = "i".to_string();
                entry.ns = Namespace::new(ns.db.clone(), "system.indexes").to_string();
                entry.o = index;
            }
        }
        self.apply_ops_with(&[entry.to_document()?], false).await
    }

    /// [`Self::create_indexes`], falling back to one applyOps per index when
    /// the destination rejects an index option or cannot create an index.
    #[instrument(skip_all, fields(ns = %ns, indexes = indexes.len()))]
    pub async fn create_indexes_with_fallback(
        &self,
        ns: &Namespace,
        indexes: &[Document],
        dest: &BuildInfo,
        uuid: Option<&Binary>,
    ) -> Result<()> {
        let err = match self.create_indexes(ns, indexes, dest).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        let fallback = err
            .command_error()
            .map_or(false, |e| is_invalid_index_option(e) || is_cannot_create_index(e));
        if !fallback {
            return Err(err);
        }

        warn!(error = %err, "createIndexes failed, retrying each index build individually");
        metrics::record_index_fallback(&ns.to_string(), indexes.len());
        for index in indexes {
            self.apply_ops_create_index(ns, index, uuid).await?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════════

    async fn list_collection_once(&self, ns: &Namespace) -> DbResult<Option<CollectionInfo>> {
        let reply = self
            .run_command_with_log(
                &ns.db,
                doc! { "listCollections": 1, "filter": { "name": ns.coll.as_str() } },
            )
            .await?;
        let batch = reply
            .get_document("cursor")
            .and_then(|cursor| cursor.get_array("firstBatch"))
            .map_err(|e| DbError::Message(format!("malformed listCollections reply: {}", e)))?;
        Ok(batch
            .first()
            .and_then(Bson::as_document)
            .and_then(CollectionInfo::from_document))
    }

    /// Look up the collection with `listCollections`. `None` if it does not exist.
    pub async fn collection_info(&self, ns: &Namespace) -> Result<Option<CollectionInfo>> {
        self.run_retryable("listCollections", |_| self.list_collection_once(ns))
            .await
    }

    /// Fetch the destination's `buildInfo`.
    pub async fn build_info(&self) -> Result<BuildInfo> {
        self.run_retryable_read("buildInfo", |_| async move {
            self.run_command_with_log("admin", doc! { "buildInfo": 1 })
                .await
                .map(|reply| BuildInfo::from_reply(&reply))
        })
        .await
    }
}
