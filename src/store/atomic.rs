//! Atomic document replacement.
//!
//! A document is never mutated in place. Every write stages the full
//! serialized payload to a temp file in the same directory (rename is only
//! atomic within one filesystem), fsyncs it, then renames it over the
//! primary. A reader therefore sees either the old complete value or the
//! new complete value, never a mix.

use crate::error::{Result, StoreError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};
use uuid::Uuid;

/// Temp file sibling of `path`, unique per writer.
///
/// Includes the pid so temp files from concurrent writers of the same
/// document never collide, and a UUID so retries within one process don't
/// either.
fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    path.with_file_name(format!(".{}-{}-{}.tmp", stem, process::id(), Uuid::new_v4()))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }
    }
    Ok(())
}

/// Durably replace the document at `path` with `value`.
///
/// Serialization happens first: an unrepresentable value fails without
/// touching any file. If `backup` is supplied and a primary already exists,
/// its current content is copied there before the rename, so the backup
/// always holds the value that was primary immediately before this write.
/// Backup failure is logged and does not abort the write.
///
/// On any failure after the temp file is created, the temp file is removed
/// before the error propagates.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T, backup: Option<&Path>) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).map_err(StoreError::Serialization)?;

    ensure_parent_dir(path)?;
    let tmp_path = staging_path(path);

    let staged = stage_payload(&tmp_path, payload.as_bytes()).and_then(|()| {
        if let Some(backup_path) = backup {
            rotate_backup(path, backup_path);
        }
        fs::rename(&tmp_path, path).map_err(StoreError::Io)
    });

    if let Err(err) = staged {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    sync_parent_dir(path);
    debug!(path = %path.display(), bytes = payload.len(), "document replaced");
    Ok(())
}

fn stage_payload(tmp_path: &Path, payload: &[u8]) -> Result<()> {
    let mut file = File::create(tmp_path).map_err(StoreError::Io)?;
    file.write_all(payload).map_err(StoreError::Io)?;
    // Data must be on stable storage before the rename makes it visible.
    file.sync_all().map_err(StoreError::Io)?;
    Ok(())
}

/// Keep one generation: copy the current primary aside before replacing it.
///
/// Best effort. The new value landing matters more than the backup, so a
/// copy failure is logged and swallowed.
fn rotate_backup(path: &Path, backup_path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::copy(path, backup_path) {
        warn!(
            path = %path.display(),
            backup = %backup_path.display(),
            error = %err,
            "backup rotation failed; continuing with write"
        );
    }
}

/// Make the rename itself durable across a crash.
///
/// Best effort: some platforms/filesystems don't support opening a
/// directory for sync.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
