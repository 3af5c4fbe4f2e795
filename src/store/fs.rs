use super::atomic::write_atomic;
use super::lock::{LockCoordinator, LockMode, DEFAULT_LOCK_TIMEOUT};
use super::recovery::load_with_fallback;
use super::DocumentStore;
use crate::error::Result;
use crate::schema::Schema;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    path.with_file_name(format!("{name}{suffix}"))
}

/// Durable store for one document at one path.
///
/// A handle binds a document path to its schema, backup location, and lock
/// file. Callers keep one handle per (path, schema) pair; there is no
/// hidden global state.
///
/// By convention the backup lives at `<name>.backup` and the lock file at
/// `<name>.lock`, both next to the document.
pub struct FileStore {
    path: PathBuf,
    backup_path: Option<PathBuf>,
    schema: Schema,
    lock: Option<LockCoordinator>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let backup_path = Some(sibling_with_suffix(&path, ".backup"));
        let lock = Some(LockCoordinator::new(
            sibling_with_suffix(&path, ".lock"),
            DEFAULT_LOCK_TIMEOUT,
        ));
        Self {
            path,
            backup_path,
            schema: Schema::empty(),
            lock,
        }
    }

    /// Attach a required-key schema (and optionally its repair policy).
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Keep the one-generation backup somewhere other than `<name>.backup`.
    pub fn with_backup_path<P: Into<PathBuf>>(mut self, backup_path: P) -> Self {
        self.backup_path = Some(backup_path.into());
        self
    }

    /// Disable backup rotation entirely.
    pub fn without_backup(mut self) -> Self {
        self.backup_path = None;
        self
    }

    /// Bound how long lock acquisition may wait before degrading.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        let lock_path = match self.lock {
            Some(coord) => coord.lock_path().to_path_buf(),
            None => sibling_with_suffix(&self.path, ".lock"),
        };
        self.lock = Some(LockCoordinator::new(lock_path, timeout));
        self
    }

    /// Skip advisory locking altogether (single-process deployments).
    pub fn without_locking(mut self) -> Self {
        self.lock = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Degraded-mode signal: how many lock acquisitions have timed out or
    /// found locking unavailable since this handle was created.
    pub fn lock_timeouts(&self) -> u64 {
        self.lock.as_ref().map_or(0, LockCoordinator::timeouts)
    }

    /// Durably replace the document with any serializable value.
    ///
    /// Takes the exclusive lock for the duration of the write; if the lock
    /// cannot be had within the timeout, the write still happens, unlocked.
    /// A failed write leaves the previous document value authoritative.
    pub fn save_as<T: Serialize>(&self, value: &T) -> Result<()> {
        let _guard = self
            .lock
            .as_ref()
            .and_then(|coord| coord.acquire(LockMode::Exclusive));
        write_atomic(&self.path, value, self.backup_path.as_deref())
    }
}

impl DocumentStore for FileStore {
    fn load(&self, default: Value) -> Value {
        let _guard = self
            .lock
            .as_ref()
            .and_then(|coord| coord.acquire(LockMode::Shared));
        load_with_fallback(
            &self.path,
            default,
            &self.schema,
            self.backup_path.as_deref(),
        )
    }

    fn save(&self, value: &Value) -> Result<()> {
        self.save_as(value)
    }
}
