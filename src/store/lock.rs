//! Cross-process advisory locking for document access.
//!
//! Locks are taken on a zero-content companion file (`<name>.lock`), never
//! on the document itself, so lock state can never interfere with the
//! atomic-rename path and a corrupted or deleted lock file can never
//! corrupt document content.
//!
//! Acquisition is bounded: we poll `try_lock` until the configured timeout
//! and then give up rather than block forever. Giving up does not fail the
//! surrounding operation — reads and writes proceed unlocked in that case.
//! A reader under contention should see a recent value rather than error
//! out, and a write must land rather than be discarded. Every degraded
//! acquisition is logged and counted so sustained contention is visible to
//! operators, not just accepted silently.
//!
//! Advisory locks release when the holding file handle closes, so a crash
//! while a lock is held leaves nothing poisoned for the next acquirer.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Concurrent readers may hold this together.
    Shared,
    /// Writers exclude readers and other writers.
    Exclusive,
}

/// Holds an advisory lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Dropping the handle would release the lock anyway; unlocking
        // explicitly just makes the release immediate.
        let _ = FileExt::unlock(&self.file);
    }
}

/// Bounded-wait lock acquisition on one lock file.
#[derive(Debug)]
pub struct LockCoordinator {
    lock_path: PathBuf,
    timeout: Duration,
    timeouts: AtomicU64,
}

impl LockCoordinator {
    pub fn new(lock_path: PathBuf, timeout: Duration) -> Self {
        Self {
            lock_path,
            timeout,
            timeouts: AtomicU64::new(0),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// How many acquisitions have degraded to unlocked operation.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Try to acquire the lock within the timeout.
    ///
    /// `None` means degraded mode: the caller performs its operation
    /// without the lock. The degradation is observable via logs and the
    /// [`timeouts`](Self::timeouts) counter only — callers see the same
    /// return contract either way.
    pub fn acquire(&self, mode: LockMode) -> Option<LockGuard> {
        let file = match self.open_lock_file() {
            Ok(file) => file,
            Err(err) => {
                self.record_degraded(&format!("lock file unavailable: {err}"));
                return None;
            }
        };

        let started = Instant::now();
        loop {
            // Trait methods named explicitly: std::fs::File has grown
            // inherent lock methods with a different error contract.
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };

            match attempt {
                Ok(()) => {
                    debug!(lock = %self.lock_path.display(), ?mode, "lock acquired");
                    return Some(LockGuard { file });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if started.elapsed() >= self.timeout {
                        self.record_degraded(&format!(
                            "timed out after {:?}",
                            started.elapsed()
                        ));
                        return None;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    // Locking not supported here (e.g. some network
                    // filesystems). Degrade the same way as a timeout.
                    self.record_degraded(&format!("locking unavailable: {err}"));
                    return None;
                }
            }
        }
    }

    fn open_lock_file(&self) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
    }

    fn record_degraded(&self, reason: &str) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            lock = %self.lock_path.display(),
            reason,
            "proceeding without lock"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let coord = LockCoordinator::new(dir.path().join("doc.lock"), DEFAULT_LOCK_TIMEOUT);

        let guard = coord.acquire(LockMode::Exclusive);
        assert!(guard.is_some());
        drop(guard);

        // Released: a second exclusive acquisition succeeds immediately.
        assert!(coord.acquire(LockMode::Exclusive).is_some());
        assert_eq!(coord.timeouts(), 0);
    }

    #[test]
    fn test_shared_locks_coexist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.lock");
        let a = LockCoordinator::new(path.clone(), DEFAULT_LOCK_TIMEOUT);
        let b = LockCoordinator::new(path, DEFAULT_LOCK_TIMEOUT);

        let first = a.acquire(LockMode::Shared);
        let second = b.acquire(LockMode::Shared);
        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn test_exclusive_contention_times_out_and_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.lock");

        let holder = LockCoordinator::new(path.clone(), DEFAULT_LOCK_TIMEOUT);
        let _held = holder.acquire(LockMode::Exclusive).unwrap();

        let contender = LockCoordinator::new(path, Duration::from_millis(120));
        let started = Instant::now();
        let guard = contender.acquire(LockMode::Exclusive);

        assert!(guard.is_none());
        assert!(started.elapsed() >= Duration::from_millis(120));
        assert_eq!(contender.timeouts(), 1);
    }

    #[test]
    fn test_lock_file_content_is_irrelevant() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.lock");
        std::fs::write(&path, "garbage that must never be parsed").unwrap();

        let coord = LockCoordinator::new(path, DEFAULT_LOCK_TIMEOUT);
        assert!(coord.acquire(LockMode::Shared).is_some());
    }
}
